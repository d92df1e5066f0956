use std::collections::HashSet;
use std::time::Instant;

use tracing::debug;

use crate::error::{QueryError, Stage};
use crate::request::Endpoints;
use crate::response::Page;
use crate::transport::QueryTransport;

/// Lazy walk over a query's cursor chain.
///
/// Each [`next_page`](Self::next_page) call issues exactly one request, using
/// the cursor handed back by the previous page. The walk ends once a page
/// comes back without a `next_cursor`.
pub struct PageWalker<'t> {
    transport: &'t dyn QueryTransport,
    endpoints: &'t Endpoints,
    query_id: String,
    page_size: u32,
    next_cursor: Option<String>,
    seen: HashSet<String>,
    max_pages: Option<usize>,
    pages_fetched: usize,
    documents_fetched: u64,
}

impl<'t> PageWalker<'t> {
    pub fn new(
        transport: &'t dyn QueryTransport,
        endpoints: &'t Endpoints,
        query_id: impl Into<String>,
        start_cursor: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            transport,
            endpoints,
            query_id: query_id.into(),
            page_size,
            next_cursor: Some(start_cursor.into()),
            seen: HashSet::new(),
            max_pages: None,
            pages_fetched: 0,
            documents_fetched: 0,
        }
    }

    /// Fail with [`QueryError::PageLimitExceeded`] instead of fetching more
    /// than `limit` pages.
    pub fn with_max_pages(mut self, limit: Option<usize>) -> Self {
        self.max_pages = limit;
        self
    }

    /// Fetch the next page, or `Ok(None)` once the chain is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Page>, QueryError> {
        let Some(cursor) = self.next_cursor.take() else {
            return Ok(None);
        };

        if let Some(limit) = self.max_pages {
            if self.pages_fetched >= limit {
                return Err(QueryError::PageLimitExceeded {
                    query_id: self.query_id.clone(),
                    limit,
                });
            }
        }
        if !self.seen.insert(cursor.clone()) {
            return Err(QueryError::CursorCycle {
                query_id: self.query_id.clone(),
                cursor,
            });
        }

        let started = Instant::now();
        let url = self.endpoints.page(&self.query_id, &cursor, self.page_size);
        let body = self
            .transport
            .get_json(&url)
            .await
            .map_err(QueryError::transport(Stage::Page))?;
        let page = Page::from_response(&body)?;

        self.pages_fetched += 1;
        self.documents_fetched += page.document_count;
        self.next_cursor = page.next_cursor.clone();

        debug!(
            query_id = %self.query_id,
            page = self.pages_fetched,
            docs = page.document_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            more = self.next_cursor.is_some(),
            "fetched page"
        );

        Ok(Some(page))
    }

    /// Drive the walk to the end.
    pub async fn drain(&mut self) -> Result<(), QueryError> {
        while !self.is_exhausted() {
            self.next_page().await?;
        }
        Ok(())
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_cursor.is_none()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn documents_fetched(&self) -> u64 {
        self.documents_fetched
    }
}
