//! Parameter catalog for query lambda runs.
//!
//! The catalog is a JSON array of records, each carrying a `parameters`
//! list. It is loaded once and sampled uniformly for every run.

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ParamError;

/// A single typed parameter passed to a query lambda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParameter {
    pub name: String,
    /// Parameter type as the service names it (e.g. "string", "int").
    #[serde(rename = "type")]
    pub param_type: String,
    pub value: serde_json::Value,
}

impl QueryParameter {
    pub fn new(
        name: impl Into<String>,
        param_type: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            value: value.into(),
        }
    }
}

/// One catalog record. Fields other than `parameters` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub parameters: Vec<QueryParameter>,
}

/// Read-only, ordered collection of parameter sets.
#[derive(Debug, Clone, Default)]
pub struct ParameterCatalog {
    records: Vec<ParameterSet>,
}

impl ParameterCatalog {
    /// Load the catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParamError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ParamError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let records: Vec<ParameterSet> =
            serde_json::from_str(&raw).map_err(|source| ParamError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), records = records.len(), "loaded parameter catalog");
        Ok(Self { records })
    }

    pub fn from_records(records: Vec<ParameterSet>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ParameterSet> {
        self.records.get(index)
    }

    /// Pick a parameter set uniformly at random using the thread RNG.
    pub fn random_parameter_set(&self) -> Result<&ParameterSet, ParamError> {
        self.choose_with(&mut rand::thread_rng())
    }

    /// Pick a parameter set uniformly at random from `[0, len - 1]`.
    pub fn choose_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&ParameterSet, ParamError> {
        if self.records.is_empty() {
            return Err(ParamError::EmptyCatalog);
        }
        let index = rng.gen_range(0..self.records.len());
        debug!(index, of = self.records.len(), "selected parameter set");
        Ok(&self.records[index])
    }
}

// ── Tests ────────────────────────────────────────────────────────
