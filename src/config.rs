//! Configuration for the replicator.
//!
//! Configuration is passed to [`Replicator::new()`](crate::Replicator) and
//! can be constructed programmatically or deserialized from YAML/JSON.
//!
//! # Quick Start
//!
//! ```rust
//! use patient_replicator::config::ReplicatorConfig;
//!
//! let config = ReplicatorConfig {
//!     batch_size: 5000,
//!     concurrency: 5,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! ReplicatorConfig
//! ├── source: SourceConfig          # Paginated HTTP API
//! │   ├── base_url
//! │   ├── page_size                 # Fixed per run
//! │   └── sort_field / sort_dir     # Fixed order => stable page boundaries
//! ├── destination: DestinationConfig
//! │   └── sqlite_path
//! ├── batch_size                    # Records per destination write
//! └── concurrency                   # Max in-flight page fetches
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! source:
//!   base_url: "http://localhost:8000/v1/patients"
//!   page_size: 100
//!
//! destination:
//!   sqlite_path: "data/destination.db"
//!
//! batch_size: 5000
//! concurrency: 5
//! ```

use crate::error::{ReplicateError, Result};
use serde::{Deserialize, Serialize};

/// The top-level config object passed to `Replicator::new()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicatorConfig {
    /// Source API settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Destination store settings.
    #[serde(default)]
    pub destination: DestinationConfig,

    /// Maximum records per batch written to the destination.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum page fetches in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            destination: DestinationConfig::default(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
        }
    }
}

impl ReplicatorConfig {
    /// Minimal config for tests: small pages, small batches, in-temp store.
    pub fn for_testing(base_url: &str, sqlite_path: &str) -> Self {
        Self {
            source: SourceConfig {
                base_url: base_url.to_string(),
                page_size: 10,
                ..SourceConfig::default()
            },
            destination: DestinationConfig {
                sqlite_path: sqlite_path.to_string(),
            },
            batch_size: 25,
            concurrency: 2,
        }
    }

    /// Validate the configuration before a run.
    pub fn validate(&self) -> Result<()> {
        if self.source.base_url.is_empty() {
            return Err(ReplicateError::Config("source.base_url is empty".into()));
        }
        if self.source.page_size == 0 {
            return Err(ReplicateError::Config("source.page_size must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(ReplicateError::Config("batch_size must be positive".into()));
        }
        if self.concurrency == 0 {
            return Err(ReplicateError::Config("concurrency must be positive".into()));
        }
        Ok(())
    }
}

/// Source API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the paginated record endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Records per page. Fixed for the duration of a run so offsets
    /// `{0, P, 2P, ...}` tile the record range without gaps or overlaps.
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Sort field requested from the source.
    #[serde(default = "default_sort_field")]
    pub sort_field: String,

    /// Sort direction requested from the source.
    #[serde(default = "default_sort_dir")]
    pub sort_dir: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            sort_field: default_sort_field(),
            sort_dir: default_sort_dir(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Destination store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Path to the destination SQLite database file.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/v1/patients".to_string()
}

fn default_page_size() -> u64 {
    100
}

fn default_sort_field() -> String {
    "last_name".to_string()
}

fn default_sort_dir() -> String {
    "asc".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_sqlite_path() -> String {
    "data/destination.db".to_string()
}

fn default_batch_size() -> usize {
    5000
}

fn default_concurrency() -> usize {
    5
}
