//! URL and request body construction for the query lambda API.

use serde::{Deserialize, Serialize};

use lambda_params::QueryParameter;

use crate::config::SessionOptions;
use crate::spec::{QuerySpec, Selector};

/// Execution hints that make the service return a query id immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncOptions {
    pub client_timeout_ms: u64,
    pub timeout_ms: u64,
    pub max_initial_results: u32,
}

/// Body of the lambda execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub async_options: AsyncOptions,
    pub parameters: Vec<QueryParameter>,
}

impl SubmitRequest {
    pub fn new(spec: &QuerySpec, options: &SessionOptions) -> Self {
        Self {
            async_options: AsyncOptions {
                client_timeout_ms: options.client_timeout_ms,
                timeout_ms: options.server_timeout_ms,
                max_initial_results: spec.page_size(),
            },
            parameters: spec.parameters().to_vec(),
        }
    }
}

/// Builds every URL the session talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    api_server: String,
}

impl Endpoints {
    pub fn new(api_server: &str) -> Self {
        Self {
            api_server: api_server.trim_end_matches('/').to_string(),
        }
    }

    /// `{server}/v1/orgs/self/ws`
    pub fn workspaces_base(&self) -> String {
        format!("{}/v1/orgs/self/ws", self.api_server)
    }

    /// Execution URL for the lambda, by tag or by version.
    pub fn submit(&self, spec: &QuerySpec) -> String {
        let (kind, value) = match spec.selector() {
            Selector::Tag(tag) => ("tags", tag),
            Selector::Version(version) => ("versions", version),
        };
        format!(
            "{}/{}/lambdas/{}/{}/{}",
            self.workspaces_base(),
            encode(spec.workspace()),
            encode(spec.query_name()),
            kind,
            encode(value),
        )
    }

    pub fn status(&self, query_id: &str) -> String {
        format!("{}/v1/orgs/self/queries/{}", self.api_server, encode(query_id))
    }

    pub fn page(&self, query_id: &str, cursor: &str, page_size: u32) -> String {
        format!(
            "{}/pages/{}?docs={}",
            self.status(query_id),
            encode(cursor),
            page_size
        )
    }
}

fn encode(segment: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(segment)
}
