use std::fmt;

use crate::transport::TransportError;

/// Exit code used for every failed invocation.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Which request of the lifecycle a transport failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submit,
    Status,
    Page,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Submit => "submit",
            Stage::Status => "status poll",
            Stage::Page => "page fetch",
        })
    }
}

/// Errors that can occur while driving a query lambda to completion.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The query spec failed validation at build time.
    #[error("invalid query spec: {0}")]
    InvalidSpec(String),

    /// A request failed or returned a non-200 response.
    #[error("{stage} failed: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: TransportError,
    },

    /// A response was missing required fields or had an unexpected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The service reported a status outside the known set.
    #[error("query {query_id} reported unrecognized status {status:?}")]
    UnrecognizedStatus { query_id: String, status: String },

    /// The service reported the query as failed.
    #[error("query {query_id} failed: {errors}")]
    QueryFailed { query_id: String, errors: String },

    /// The optional client-side deadline elapsed before completion.
    #[error("query {query_id} not completed within {seconds}s")]
    DeadlineExceeded { query_id: String, seconds: u64 },

    /// The service handed back a cursor that was already fetched.
    #[error("query {query_id} revisited cursor {cursor}")]
    CursorCycle { query_id: String, cursor: String },

    #[error("query {query_id} exceeded page limit of {limit}")]
    PageLimitExceeded { query_id: String, limit: usize },
}

impl QueryError {
    pub(crate) fn transport(stage: Stage) -> impl FnOnce(TransportError) -> Self {
        move |source| QueryError::Transport { stage, source }
    }

    /// Process exit code for this failure. All failures share one code.
    pub fn exit_code(&self) -> i32 {
        FAILURE_EXIT_CODE
    }

    /// The lifecycle stage for transport failures.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            QueryError::Transport { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
