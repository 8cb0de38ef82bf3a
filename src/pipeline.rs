// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Run orchestration.
//!
//! The [`Replicator`] is the sole public entry point for a replication run:
//!
//! 1. fetch page 0 to discover `total_items` (fatal if this fails)
//! 2. schedule bounded-parallel fetches for the remaining offsets
//! 3. flatten and sort the collected records into canonical order
//! 4. assemble fixed-size batches
//! 5. apply each batch strictly in order, one writer at a time
//!
//! Page and batch failures degrade the run and are reported in the
//! [`RunSummary`]; only the inability to start (discovery) aborts it.
//!
//! # Cancellation
//!
//! [`CancelHandle::cancel()`] stops the run promptly: the scheduler issues no
//! new fetches and the orchestrator starts no new batch, but an in-flight
//! batch write is allowed to finish so `patients` and `history` never
//! disagree about a batch.

use crate::batch::assemble;
use crate::config::ReplicatorConfig;
use crate::error::{ReplicateError, Result};
use crate::fetch::{HttpPageSource, PageSource};
use crate::metrics;
use crate::record::sort_records;
use crate::scheduler::{plan_offsets, PageScheduler};
use crate::store::ReplicationStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, warn};

/// Outcome of one replication run, for logging or exit-code derivation by
/// the surrounding CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Total item count reported by the source at discovery.
    pub total_items: u64,
    /// Records collected across all successful pages.
    pub fetched: usize,
    /// Records written through successfully applied batches.
    pub stored: usize,
    /// Pages that contributed zero records.
    pub failed_pages: usize,
    /// Batches that were not applied (write failure or cancellation).
    pub failed_batches: usize,
}

impl RunSummary {
    /// Check if the run completed without any degradation.
    pub fn is_complete(&self) -> bool {
        self.failed_pages == 0 && self.failed_batches == 0
    }
}

/// Handle for cancelling a running replication from another task.
#[derive(Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// The replication orchestrator. One instance drives one run at a time
/// against one destination; concurrent runs against the same destination
/// are unsupported.
pub struct Replicator<S: PageSource = HttpPageSource> {
    config: ReplicatorConfig,
    source: Arc<S>,
    store: ReplicationStore,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl Replicator<HttpPageSource> {
    /// Build a replicator from configuration: HTTP source, SQLite store.
    ///
    /// The destination schema is assumed to be provisioned already
    /// (see [`ReplicationStore::provision`]).
    pub async fn from_config(config: ReplicatorConfig) -> Result<Self> {
        config.validate()?;
        let source = Arc::new(HttpPageSource::new(&config.source)?);
        let store = ReplicationStore::open(&config.destination.sqlite_path).await?;
        Ok(Self::with_source(config, source, store))
    }
}

impl<S: PageSource> Replicator<S> {
    /// Create a replicator over an arbitrary page source.
    ///
    /// This is the seam tests use; production callers go through
    /// [`Replicator::from_config`].
    pub fn with_source(config: ReplicatorConfig, source: Arc<S>, store: ReplicationStore) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            config,
            source,
            store,
            cancel_tx,
            cancel_rx,
        }
    }

    /// Get a handle that can cancel this replicator's run.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    /// Access the destination store (for verification and diagnostics).
    pub fn store(&self) -> &ReplicationStore {
        &self.store
    }

    /// Execute one full replication run.
    ///
    /// Returns `Discovery` if the first page cannot be fetched or carries no
    /// total count; any other trouble is contained and reported through the
    /// summary.
    pub async fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;
        let started = Instant::now();

        if *self.cancel_rx.borrow() {
            info!("Run cancelled before start");
            return Ok(RunSummary::default());
        }

        // Step 1: discovery. The first page doubles as data and as the
        // source of the total count that plans the rest of the run.
        let first_page = self
            .source
            .fetch_page(0)
            .await
            .map_err(|e| ReplicateError::Discovery(format!("first page fetch failed: {}", e)))?;

        let total_items = first_page.total_items().ok_or_else(|| {
            ReplicateError::Discovery("first page carried no total_items".to_string())
        })?;

        info!(total_items, "Discovered record range");

        if total_items == 0 {
            metrics::record_run(0, 0, 0, started.elapsed());
            return Ok(RunSummary::default());
        }

        // Step 2: bounded-parallel fetch of the remaining offsets. Offset 0
        // is already in hand from discovery.
        let page_size = self.source.page_size();
        let offsets: Vec<u64> = plan_offsets(total_items, page_size)
            .into_iter()
            .skip(1)
            .collect();

        let scheduler = PageScheduler::new(self.config.concurrency);
        let outcome = scheduler
            .fetch_offsets(Arc::clone(&self.source), offsets, self.cancel_rx.clone())
            .await;

        // Step 3: flatten and sort. Completion order is arbitrary; the sort
        // makes batch boundaries reproducible for a given source snapshot.
        let mut records = first_page.data;
        records.extend(outcome.records);
        let fetched = records.len();
        sort_records(&mut records);

        // Step 4: assemble batches.
        let batches = assemble(records, self.config.batch_size);

        // Step 5: apply sequentially. One batch in flight at a time keeps
        // the destination a single-writer resource and rules out upsert
        // races on ids straddling batch boundaries.
        let mut stored = 0;
        let mut failed_batches = 0;

        for (index, batch) in batches.iter().enumerate() {
            if *self.cancel_rx.borrow() {
                warn!(
                    remaining = batches.len() - index,
                    "Run cancelled, skipping remaining batches"
                );
                failed_batches += batches.len() - index;
                break;
            }

            match self.store.apply_batch(batch).await {
                Ok(()) => stored += batch.len(),
                Err(e) => {
                    warn!(batch = index, error = %e, "Batch failed to apply, continuing");
                    metrics::record_batch_failed();
                    failed_batches += 1;
                }
            }
        }

        let summary = RunSummary {
            total_items,
            fetched,
            stored,
            failed_pages: outcome.failed_pages,
            failed_batches,
        };

        metrics::record_run(fetched, stored, summary.failed_pages, started.elapsed());
        info!(
            total_items,
            fetched,
            stored,
            failed_pages = summary.failed_pages,
            failed_batches,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Replication run finished"
        );

        Ok(summary)
    }

    /// Release the destination store. Call on every exit path.
    pub async fn close(&self) {
        self.store.close().await;
    }
}
