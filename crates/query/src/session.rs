//! Query lambda session: submit, poll, paginate.
//!
//! A [`QuerySession`] owns one execution end to end:
//! 1. Submit the lambda with async options so the service returns a query id
//! 2. Poll the status resource at a fixed interval while QUEUED/RUNNING
//! 3. On COMPLETED, walk the cursor chain until no `next_cursor` remains

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::{QueryErrorPolicy, ServiceConfig, SessionOptions};
use crate::error::{QueryError, Stage};
use crate::pager::PageWalker;
use crate::request::{Endpoints, SubmitRequest};
use crate::response::{self, CompletionStart, SubmitAck};
use crate::spec::QuerySpec;
use crate::status::QueryStatus;
use crate::transport::QueryTransport;

/// Summary of a session that reached DONE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub query_id: String,
    pub total_result_count: Option<u64>,
    pub pages_fetched: usize,
    pub documents_fetched: u64,
    pub status_polls: usize,
    /// Submission to COMPLETED.
    pub query_time: Duration,
    /// Submission to DONE.
    pub total_time: Duration,
}

pub struct QuerySession<'t> {
    spec: QuerySpec,
    transport: &'t dyn QueryTransport,
    endpoints: Endpoints,
    options: SessionOptions,
    query_id: String,
    status: QueryStatus,
    started_at: Option<DateTime<Utc>>,
    started: Option<Instant>,
    total_result_count: Option<u64>,
    status_polls: usize,
}

impl<'t> QuerySession<'t> {
    pub fn new(
        spec: QuerySpec,
        transport: &'t dyn QueryTransport,
        config: &ServiceConfig,
        options: SessionOptions,
    ) -> Self {
        Self {
            spec,
            transport,
            endpoints: Endpoints::new(&config.api_server),
            options,
            query_id: String::new(),
            status: QueryStatus::Pending,
            started_at: None,
            started: None,
            total_result_count: None,
            status_polls: 0,
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Empty until the service has accepted the submission.
    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Known once the query has COMPLETED.
    pub fn total_result_count(&self) -> Option<u64> {
        self.total_result_count
    }

    pub fn status_polls(&self) -> usize {
        self.status_polls
    }

    /// Run the full lifecycle. On failure the session is left in
    /// [`QueryStatus::Error`] and no further requests are issued.
    pub async fn run(&mut self) -> Result<SessionReport, QueryError> {
        match self.drive().await {
            Ok(report) => Ok(report),
            Err(err) => {
                self.status = QueryStatus::Error;
                error!(query_id = %self.query_id, error = %err, "query session failed");
                Err(err)
            }
        }
    }

    async fn drive(&mut self) -> Result<SessionReport, QueryError> {
        let submitted = self.submit().await?;
        let completed = self.poll_until_completed(submitted).await?;

        let query_time = self.elapsed();
        info!(
            query_id = %self.query_id,
            query_time_ms = query_time.as_millis() as u64,
            polls = self.status_polls,
            "query completed"
        );

        let (pages_fetched, documents_fetched) = if self.options.paginate {
            let start = CompletionStart::from_response(&completed)?;
            self.total_result_count = Some(start.total_result_count);
            debug!(
                query_id = %self.query_id,
                total = start.total_result_count,
                "starting pagination"
            );

            let mut walker = PageWalker::new(
                self.transport,
                &self.endpoints,
                self.query_id.clone(),
                start.start_cursor,
                self.spec.page_size(),
            )
            .with_max_pages(self.options.max_pages);
            walker.drain().await?;
            (walker.pages_fetched(), walker.documents_fetched())
        } else {
            self.total_result_count = match CompletionStart::from_response(&completed) {
                Ok(start) => Some(start.total_result_count),
                Err(err) => {
                    warn!(
                        query_id = %self.query_id,
                        error = %err,
                        "COMPLETED response carries no usable result count"
                    );
                    None
                }
            };
            (0, 0)
        };

        self.status = QueryStatus::Done;
        let total_time = self.elapsed();
        info!(
            query_id = %self.query_id,
            pages = pages_fetched,
            docs = documents_fetched,
            total_time_ms = total_time.as_millis() as u64,
            "query session done"
        );

        Ok(SessionReport {
            query_id: self.query_id.clone(),
            total_result_count: self.total_result_count,
            pages_fetched,
            documents_fetched,
            status_polls: self.status_polls,
            query_time,
            total_time,
        })
    }

    /// POST the lambda execution and record the assigned query id.
    async fn submit(&mut self) -> Result<Value, QueryError> {
        let url = self.endpoints.submit(&self.spec);
        let body = serde_json::to_value(SubmitRequest::new(&self.spec, &self.options))
            .map_err(|e| QueryError::Protocol(format!("cannot encode submit body: {e}")))?;

        self.started_at = Some(Utc::now());
        self.started = Some(Instant::now());
        info!(
            workspace = %self.spec.workspace(),
            lambda = %self.spec.query_name(),
            selector = ?self.spec.selector(),
            "submitting query lambda"
        );

        let response = self
            .transport
            .post_json(&url, &body)
            .await
            .map_err(QueryError::transport(Stage::Submit))?;

        let ack = SubmitAck::from_response(&response)?;
        self.query_id = ack.query_id;
        info!(query_id = %self.query_id, status = %ack.status, "query submitted");
        Ok(response)
    }

    /// Poll while QUEUED/RUNNING and return the COMPLETED response.
    async fn poll_until_completed(&mut self, mut body: Value) -> Result<Value, QueryError> {
        loop {
            if let Some(errors) = response::query_errors(&body) {
                warn!(query_id = %self.query_id, errors = %errors, "service reported query errors");
                if self.options.error_policy == QueryErrorPolicy::TerminateOnError {
                    return Err(QueryError::QueryFailed {
                        query_id: self.query_id.clone(),
                        errors,
                    });
                }
            }

            let raw = response::poll_status(&body)?;
            let status = QueryStatus::from_wire(raw).ok_or_else(|| {
                QueryError::UnrecognizedStatus {
                    query_id: self.query_id.clone(),
                    status: raw.to_string(),
                }
            })?;
            self.status = status;

            match status {
                QueryStatus::Completed => return Ok(body),
                in_flight if in_flight.is_in_flight() => {
                    self.check_deadline()?;
                    tokio::time::sleep(self.options.poll_interval).await;
                    body = self.fetch_status().await?;
                }
                QueryStatus::Error => {
                    return Err(QueryError::QueryFailed {
                        query_id: self.query_id.clone(),
                        errors: response::query_errors(&body)
                            .unwrap_or_else(|| "service reported ERROR".to_string()),
                    });
                }
                // never produced by from_wire
                _ => {
                    return Err(QueryError::UnrecognizedStatus {
                        query_id: self.query_id.clone(),
                        status: status.to_string(),
                    });
                }
            }
        }
    }

    async fn fetch_status(&mut self) -> Result<Value, QueryError> {
        let url = self.endpoints.status(&self.query_id);
        let body = self
            .transport
            .get_json(&url)
            .await
            .map_err(QueryError::transport(Stage::Status))?;
        self.status_polls += 1;
        debug!(
            query_id = %self.query_id,
            poll = self.status_polls,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "polled query status"
        );
        Ok(body)
    }

    fn check_deadline(&self) -> Result<(), QueryError> {
        match self.options.deadline {
            Some(deadline) if self.elapsed() >= deadline => {
                warn!(query_id = %self.query_id, "client deadline reached before completion");
                Err(QueryError::DeadlineExceeded {
                    query_id: self.query_id.clone(),
                    seconds: deadline.as_secs(),
                })
            }
            _ => Ok(()),
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }
}
