//! Typed views over the loosely shaped JSON the service returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QueryError;

/// Fields every submit response must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitAck {
    pub query_id: String,
    pub status: String,
}

impl SubmitAck {
    pub fn from_response(body: &Value) -> Result<Self, QueryError> {
        let query_id = body
            .get("query_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| QueryError::Protocol("submit response has no query_id".into()))?;
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| QueryError::Protocol("submit response has no status".into()))?;

        Ok(Self {
            query_id: query_id.to_string(),
            status: status.to_string(),
        })
    }
}

/// Status string from a status-resource response (`data.status`, or a
/// top-level `status`).
pub fn poll_status(body: &Value) -> Result<&str, QueryError> {
    body.get("data")
        .and_then(|d| d.get("status"))
        .or_else(|| body.get("status"))
        .and_then(Value::as_str)
        .ok_or_else(|| QueryError::Protocol("status response has no status".into()))
}

/// Non-empty query errors reported anywhere the service puts them, rendered
/// as compact JSON.
pub fn query_errors(body: &Value) -> Option<String> {
    let data = body.get("data");
    ["query_errors", "errors"]
        .iter()
        .filter_map(|key| {
            body.get(*key)
                .or_else(|| data.and_then(|d| d.get(*key)))
        })
        .find(|v| is_populated(v))
        .map(Value::to_string)
}

fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Where pagination starts once a query has COMPLETED.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionStart {
    pub total_result_count: u64,
    pub start_cursor: String,
}

impl CompletionStart {
    /// Extract from either response shape: inline (`results_total_doc_count`
    /// plus `pagination.start_cursor` at the top level) or nested under `data`.
    pub fn from_response(body: &Value) -> Result<Self, QueryError> {
        match body.get("data").filter(|d| d.is_object()) {
            Some(data) => Self::from_nested(data),
            None => Self::from_inline(body),
        }
    }

    fn from_inline(body: &Value) -> Result<Self, QueryError> {
        let total = body
            .get("results_total_doc_count")
            .and_then(Value::as_u64)
            .ok_or_else(|| QueryError::Protocol("missing results_total_doc_count".into()))?;
        Ok(Self {
            total_result_count: total,
            start_cursor: start_cursor(body)?,
        })
    }

    fn from_nested(data: &Value) -> Result<Self, QueryError> {
        let total = data
            .get("results_total_doc_count")
            .or_else(|| data.get("stats").and_then(|s| s.get("result_set_document_count")))
            .and_then(Value::as_u64)
            .ok_or_else(|| QueryError::Protocol("missing data result document count".into()))?;
        Ok(Self {
            total_result_count: total,
            start_cursor: start_cursor(data)?,
        })
    }
}

fn start_cursor(container: &Value) -> Result<String, QueryError> {
    container
        .get("pagination")
        .and_then(|p| p.get("start_cursor"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| QueryError::Protocol("missing pagination.start_cursor".into()))
}

/// One fetched page of results. Only its shape is kept, never its documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub document_count: u64,
    /// `None` ends the cursor chain.
    pub next_cursor: Option<String>,
}

impl Page {
    pub fn from_response(body: &Value) -> Result<Self, QueryError> {
        let pagination = body
            .get("pagination")
            .ok_or_else(|| QueryError::Protocol("page response has no pagination".into()))?;
        let document_count = pagination
            .get("current_page_doc_count")
            .and_then(Value::as_u64)
            .ok_or_else(|| QueryError::Protocol("missing pagination.current_page_doc_count".into()))?;
        let next_cursor = match pagination.get("next_cursor") {
            None | Some(Value::Null) => None,
            Some(Value::String(cursor)) => Some(cursor.clone()),
            Some(other) => {
                return Err(QueryError::Protocol(format!(
                    "next_cursor is not a string: {other}"
                )))
            }
        };
        Ok(Self {
            document_count,
            next_cursor,
        })
    }
}
