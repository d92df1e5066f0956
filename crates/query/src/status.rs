use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a query session.
///
/// `Pending` and `Done` are local states; the service only ever reports
/// QUEUED, RUNNING, COMPLETED or ERROR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Done,
    Error,
}

impl QueryStatus {
    /// Map a status string reported by the service. Returns `None` for
    /// anything outside the reported set.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "QUEUED" => Some(QueryStatus::Queued),
            "RUNNING" => Some(QueryStatus::Running),
            "COMPLETED" => Some(QueryStatus::Completed),
            "ERROR" => Some(QueryStatus::Error),
            _ => None,
        }
    }

    /// Still executing server-side; keep polling.
    pub fn is_in_flight(self) -> bool {
        matches!(self, QueryStatus::Queued | QueryStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Pending => "PENDING",
            QueryStatus::Queued => "QUEUED",
            QueryStatus::Running => "RUNNING",
            QueryStatus::Completed => "COMPLETED",
            QueryStatus::Done => "DONE",
            QueryStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
