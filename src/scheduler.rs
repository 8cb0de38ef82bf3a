// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bounded-parallel page fetching.
//!
//! Given the total item count discovered from the first page, the scheduler
//! computes the full offset set `{0, P, 2P, ...}` and fans the fetches out
//! over a semaphore-bounded worker pool. Each fetch is independent and
//! produces an immutable page; there is no shared mutable state between
//! workers.
//!
//! # Failure Containment
//!
//! A failed page yields zero records for its offset and increments the
//! failure count. A degraded-but-partial replication beats losing the whole
//! run to one bad page; the caller surfaces the count in its run summary.
//!
//! # Ordering
//!
//! Completion order is unconstrained. The orchestrator re-sorts the flattened
//! record sequence into canonical order before batching, so batch boundaries
//! are reproducible regardless of which fetch finished first.

use crate::error::ReplicateError;
use crate::fetch::PageSource;
use crate::metrics;
use crate::record::Record;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Result of a scheduled fetch pass.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// All records collected, in completion order (not yet canonical).
    pub records: Vec<Record>,
    /// Number of offsets the scheduler was asked to cover.
    pub pages_planned: usize,
    /// Number of offsets that produced no records due to an error
    /// or cancellation.
    pub failed_pages: usize,
}

/// Compute the offsets covering `[0, total_items)` at `page_size` stride.
///
/// Exactly `ceil(total_items / page_size)` offsets, no gaps, no overlaps.
pub fn plan_offsets(total_items: u64, page_size: u64) -> Vec<u64> {
    if page_size == 0 {
        return Vec::new();
    }
    (0..total_items).step_by(page_size as usize).collect()
}

/// Dispatches page fetches across a bounded worker pool.
pub struct PageScheduler {
    concurrency: usize,
}

impl PageScheduler {
    /// Create a scheduler allowing at most `concurrency` in-flight fetches.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch every offset in `offsets`, at most `concurrency` at a time.
    ///
    /// Cancellation is observed between permit acquisition and dispatch:
    /// once `cancel` flips to `true`, no new request is issued, and offsets
    /// that never ran are counted as failed pages.
    pub async fn fetch_offsets<S: PageSource>(
        &self,
        source: Arc<S>,
        offsets: Vec<u64>,
        cancel: watch::Receiver<bool>,
    ) -> FetchOutcome {
        let pages_planned = offsets.len();
        let mut outcome = FetchOutcome {
            pages_planned,
            ..Default::default()
        };

        if offsets.is_empty() {
            return outcome;
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set: JoinSet<(u64, Result<Vec<Record>, ReplicateError>)> = JoinSet::new();

        for offset in offsets {
            let source = Arc::clone(&source);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();

            join_set.spawn(async move {
                // Closed semaphore is unreachable here; treat it as cancellation.
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return (offset, Err(ReplicateError::Internal("semaphore closed".into()))),
                };

                if *cancel.borrow() {
                    debug!(offset, "Cancelled before dispatch, skipping fetch");
                    return (
                        offset,
                        Err(ReplicateError::fetch_msg(offset, "cancelled before dispatch")),
                    );
                }

                match source.fetch_page(offset).await {
                    Ok(page) => (offset, Ok(page.data)),
                    Err(e) => (offset, Err(e)),
                }
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((offset, Ok(records))) => {
                    debug!(offset, records = records.len(), "Page collected");
                    outcome.records.extend(records);
                }
                Ok((offset, Err(e))) => {
                    warn!(offset, error = %e, "Page fetch failed, continuing without it");
                    metrics::record_page_failed();
                    outcome.failed_pages += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Fetch task panicked or was aborted (JoinError)");
                    metrics::record_page_failed();
                    outcome.failed_pages += 1;
                }
            }
        }

        outcome
    }
}
