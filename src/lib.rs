//! # Patient Replicator
//!
//! Replicates a paginated remote record set into a local SQLite store,
//! maintaining a current-state table (`patients`, upsert by `id`) and an
//! append-only change log (`history`).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         patient-replicator                          │
//! │                                                                     │
//! │  ┌──────────────┐    ┌───────────────┐    ┌──────────────────────┐  │
//! │  │ PageScheduler│───►│ sort + batch  │───►│ ReplicationStore     │  │
//! │  │ (bounded     │    │ (deterministic│    │ (staging upsert +    │  │
//! │  │  fan-out)    │    │  assembly)    │    │  history append)     │  │
//! │  └──────────────┘    └───────────────┘    └──────────────────────┘  │
//! │         │                                                           │
//! │         ▼                                                           │
//! │  ┌──────────────┐                                                   │
//! │  │ PageSource   │  GET <base>?offset=&limit=&sort_field=&sort_dir=  │
//! │  │ (HTTP)       │                                                   │
//! │  └──────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each run is a full re-fetch: discovery at offset 0 reports the total,
//! pages are fetched in bounded parallel, records are re-sorted into a
//! deterministic order, and batches are applied to the destination strictly
//! one at a time. Failed pages and batches degrade the run and are counted
//! in the [`RunSummary`] rather than aborting it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use patient_replicator::{Replicator, ReplicatorConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ReplicatorConfig::default();
//!     let replicator = Replicator::from_config(config)
//!         .await
//!         .expect("Failed to initialize");
//!
//!     let summary = replicator.run().await.expect("Run could not start");
//!     println!("stored {} of {} records", summary.stored, summary.fetched);
//!
//!     replicator.close().await;
//! }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod resilience;
pub mod scheduler;
pub mod store;

// Re-exports for convenience
pub use batch::{assemble, Batch};
pub use config::{DestinationConfig, ReplicatorConfig, SourceConfig};
pub use error::{ReplicateError, Result};
pub use fetch::{HttpPageSource, PageSource};
pub use pipeline::{CancelHandle, Replicator, RunSummary};
pub use record::{Page, PageMeta, Record};
pub use resilience::{RetryConfig, RetryingSource};
pub use scheduler::{plan_offsets, FetchOutcome, PageScheduler};
pub use store::{PatientRow, ReplicationStore};
