use serde::{Deserialize, Serialize};

use lambda_params::QueryParameter;

use crate::config::DEFAULT_PAGE_SIZE;
use crate::error::QueryError;

/// How a query lambda revision is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// Mutable label, resolves to whatever revision carries it.
    Tag(String),
    /// Immutable revision.
    Version(String),
}

/// Fully validated description of one query lambda execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    workspace: String,
    query_name: String,
    selector: Selector,
    parameters: Vec<QueryParameter>,
    page_size: u32,
}

impl QuerySpec {
    pub fn builder(workspace: impl Into<String>, query_name: impl Into<String>) -> QuerySpecBuilder {
        QuerySpecBuilder {
            workspace: workspace.into(),
            query_name: query_name.into(),
            tag: None,
            version: None,
            parameters: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn query_name(&self) -> &str {
        &self.query_name
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

/// Builder for [`QuerySpec`]; exactly one of `tag`/`version` must be set.
#[derive(Debug, Clone)]
pub struct QuerySpecBuilder {
    workspace: String,
    query_name: String,
    tag: Option<String>,
    version: Option<String>,
    parameters: Vec<QueryParameter>,
    page_size: u32,
}

impl QuerySpecBuilder {
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn parameters(mut self, parameters: Vec<QueryParameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn build(self) -> Result<QuerySpec, QueryError> {
        if self.workspace.is_empty() {
            return Err(QueryError::InvalidSpec("workspace is empty".into()));
        }
        if self.query_name.is_empty() {
            return Err(QueryError::InvalidSpec("query name is empty".into()));
        }
        if self.page_size == 0 {
            return Err(QueryError::InvalidSpec("page size must be positive".into()));
        }

        let selector = match (self.tag, self.version) {
            (Some(_), Some(_)) => {
                return Err(QueryError::InvalidSpec(
                    "both tag and version are set".into(),
                ))
            }
            (None, None) => {
                return Err(QueryError::InvalidSpec(
                    "one of tag or version is required".into(),
                ))
            }
            (Some(tag), None) if !tag.is_empty() => Selector::Tag(tag),
            (None, Some(version)) if !version.is_empty() => Selector::Version(version),
            _ => return Err(QueryError::InvalidSpec("selector is empty".into())),
        };

        Ok(QuerySpec {
            workspace: self.workspace,
            query_name: self.query_name,
            selector,
            parameters: self.parameters,
            page_size: self.page_size,
        })
    }
}
