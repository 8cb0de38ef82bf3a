// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Page fetching from the source API.
//!
//! Defines the [`PageSource`] seam the rest of the pipeline works against,
//! plus the real [`HttpPageSource`] implementation over reqwest.
//!
//! The trait exists so the scheduler and orchestrator can be tested with
//! scripted pages and injected failures instead of a live HTTP server.
//!
//! A fetcher does exactly one thing: one page, one request, no retries.
//! Retry-with-backoff is a wrapping policy, see [`crate::resilience`].

use crate::config::SourceConfig;
use crate::error::{ReplicateError, Result};
use crate::metrics;
use crate::record::Page;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A paginated source of records.
///
/// `fetch_page(offset)` returns the page starting at `offset`. The page size
/// and sort order are fixed per source instance so page boundaries are
/// deterministic and non-overlapping across concurrent calls. Only the page
/// at offset 0 is expected to carry `meta.total_items`.
pub trait PageSource: Send + Sync + 'static {
    /// Fetch one page of records starting at `offset`.
    fn fetch_page(&self, offset: u64) -> BoxFuture<'_, Page>;

    /// The fixed page size this source serves.
    fn page_size(&self) -> u64;
}

/// HTTP implementation of [`PageSource`].
///
/// Issues `GET <base>?offset=<o>&limit=<page_size>&sort_field=<f>&sort_dir=<d>`
/// and parses the JSON body into a [`Page`]. Non-success status and malformed
/// payloads are both fetch failures carrying the offset.
pub struct HttpPageSource {
    client: reqwest::Client,
    base_url: String,
    page_size: u64,
    sort_field: String,
    sort_dir: String,
}

impl HttpPageSource {
    /// Create a new HTTP page source.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the HTTP client cannot be built
    /// (e.g. TLS or proxy misconfiguration).
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("patient-replicator/0.2")
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ReplicateError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            page_size: config.page_size,
            sort_field: config.sort_field.clone(),
            sort_dir: config.sort_dir.clone(),
        })
    }

    async fn fetch_page_inner(&self, offset: u64) -> Result<Page> {
        let started = Instant::now();
        let result = self.request_page(offset).await;

        // One sample per attempt, success or not: transport errors and
        // decode errors count as failures just like bad status codes.
        metrics::record_page_fetch(result.is_ok(), started.elapsed());

        if let Ok(page) = &result {
            debug!(
                offset,
                records = page.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Fetched page"
            );
        }

        result
    }

    async fn request_page(&self, offset: u64) -> Result<Page> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("offset", offset.to_string()),
                ("limit", self.page_size.to_string()),
                ("sort_field", self.sort_field.clone()),
                ("sort_dir", self.sort_dir.clone()),
            ])
            .send()
            .await
            .map_err(|e| ReplicateError::fetch(offset, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(offset, status = %status, "Source returned non-success status");
            return Err(ReplicateError::fetch_msg(
                offset,
                format!("HTTP {}", status),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ReplicateError::fetch(offset, e))
    }
}

impl PageSource for HttpPageSource {
    fn fetch_page(&self, offset: u64) -> BoxFuture<'_, Page> {
        Box::pin(async move { self.fetch_page_inner(offset).await })
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }
}
