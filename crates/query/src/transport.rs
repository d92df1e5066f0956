//! HTTP transport for the query lambda API.
//!
//! The session only sees [`QueryTransport`]; [`HttpTransport`] is the
//! reqwest-backed implementation with API-key auth and optional bounded
//! retries for transient failures on idempotent GETs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ServiceConfig;

/// Errors from a single request.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The service answered with something other than 200 OK.
    #[error("HTTP {status} {reason}: {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("request failed: {0}")]
    Network(String),

    #[error("invalid JSON response: {0}")]
    Decode(String),

    /// The HTTP client could not be built.
    #[error("client setup failed: {0}")]
    Client(String),
}

impl TransportError {
    /// Worth retrying: connection problems, throttling, server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::Decode(_) | TransportError::Client(_) => false,
        }
    }
}

/// JSON request/response channel to the query service.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError>;

    async fn get_json(&self, url: &str) -> Result<Value, TransportError>;
}

/// reqwest-backed [`QueryTransport`].
pub struct HttpTransport {
    http: reqwest::Client,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpTransport {
    pub fn new(config: &ServiceConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("ApiKey {}", config.api_key))
            .map_err(|e| TransportError::Client(format!("invalid API key: {e}")))?;
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        debug!(
            api_server = %config.api_server,
            max_retries = config.max_retries,
            "HttpTransport initialised"
        );

        Ok(Self {
            http,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Run `build` until it succeeds, fails permanently, or retries run out.
    async fn with_retry<F>(&self, url: &str, build: F) -> Result<Value, TransportError>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            match self.send(build()).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let backoff = backoff_for(self.retry_backoff, attempt);
                    warn!(
                        url = %url,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// `initial * 2^attempt`, saturating.
fn backoff_for(initial: Duration, attempt: u32) -> Duration {
    initial.saturating_mul(2_u32.saturating_pow(attempt))
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError> {
        // Never retried: a lost response may still have started an execution.
        debug!(url = %url, "POST");
        self.send(self.http.post(url).json(body)).await
    }

    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        debug!(url = %url, "GET");
        self.with_retry(url, || self.http.get(url)).await
    }
}
