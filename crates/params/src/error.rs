use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or sampling the parameter catalog.
#[derive(Error, Debug)]
pub enum ParamError {
    #[error("failed to read parameter catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid parameter catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("parameter catalog is empty")]
    EmptyCatalog,
}
