//! Scripted [`QueryTransport`] that records every request.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use lambda_query::*;

pub const API_SERVER: &str = "https://api.test";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Post { url: String, body: Value },
    Get { url: String },
}

impl Call {
    pub fn url(&self) -> &str {
        match self {
            Call::Post { url, .. } | Call::Get { url } => url,
        }
    }
}

type Fallback = Box<dyn Fn(usize) -> Value + Send + Sync>;

pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Value, TransportError>>>,
    calls: Mutex<Vec<Call>>,
    fallback: Option<Fallback>,
    max_calls: usize,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<Value, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            fallback: None,
            max_calls: 1_000,
        }
    }

    /// Answer with `f(call_index)` once the script runs out.
    pub fn with_fallback(mut self, f: impl Fn(usize) -> Value + Send + Sync + 'static) -> Self {
        self.fallback = Some(Box::new(f));
        self
    }

    /// Refuse (with a network error) every call past `max_calls`.
    pub fn with_max_calls(mut self, max_calls: usize) -> Self {
        self.max_calls = max_calls;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.url().to_string()).collect()
    }

    fn respond(&self, call: Call) -> Result<Value, TransportError> {
        let mut calls = self.calls.lock().unwrap();
        if calls.len() >= self.max_calls {
            return Err(TransportError::Network("call guard tripped".into()));
        }
        calls.push(call);
        let index = calls.len() - 1;
        drop(calls);

        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.fallback {
            Some(f) => Ok(f(index)),
            None => panic!("script exhausted at call {index}"),
        }
    }
}

#[async_trait]
impl QueryTransport for ScriptedTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError> {
        self.respond(Call::Post {
            url: url.to_string(),
            body: body.clone(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        self.respond(Call::Get {
            url: url.to_string(),
        })
    }
}

// ── Fixtures ─────────────────────────────────────────────────────

pub fn service() -> ServiceConfig {
    ServiceConfig::new(API_SERVER, "test-key")
}

pub fn fast_options() -> SessionOptions {
    SessionOptions {
        poll_interval: Duration::ZERO,
        ..SessionOptions::default()
    }
}

pub fn spec(page_size: u32) -> QuerySpec {
    QuerySpec::builder("taxi", "trips")
        .tag("latest")
        .parameters(vec![QueryParameter::new("borough", "string", "Queens")])
        .page_size(page_size)
        .build()
        .unwrap()
}

pub fn submitted(query_id: &str, status: &str) -> Value {
    json!({"query_id": query_id, "status": status})
}

pub fn polled(status: &str) -> Value {
    json!({"data": {"status": status}})
}

pub fn completed_nested(total: u64, start_cursor: &str) -> Value {
    json!({
        "data": {
            "status": "COMPLETED",
            "stats": {"result_set_document_count": total},
            "pagination": {"start_cursor": start_cursor}
        }
    })
}

pub fn page(docs: u64, next_cursor: Option<&str>) -> Value {
    json!({
        "results": [],
        "pagination": {"current_page_doc_count": docs, "next_cursor": next_cursor}
    })
}

pub fn http_error(status: u16, reason: &str) -> TransportError {
    TransportError::Status {
        status,
        reason: reason.to_string(),
        body: format!("{{\"message\": \"{reason}\"}}"),
    }
}

pub fn status_url(query_id: &str) -> String {
    format!("{API_SERVER}/v1/orgs/self/queries/{query_id}")
}

pub fn page_url(query_id: &str, cursor: &str, page_size: u32) -> String {
    format!("{}/pages/{cursor}?docs={page_size}", status_url(query_id))
}
