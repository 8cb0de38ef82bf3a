// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the replication pipeline.
//!
//! Errors are categorized by the stage they occur in, and each carries
//! enough context (the page offset, the failing statement) to correlate
//! with logs.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |-------------|-----------|-------------|
//! | `Fetch` | Yes | Network failure, non-success status, malformed page payload |
//! | `Discovery` | No | First-page fetch failed; the run cannot be planned |
//! | `Store` | No | Destination write failure (SQLite) |
//! | `Config` | No | Configuration invalid |
//! | `Internal` | No | Unexpected internal error |
//!
//! # Containment
//!
//! `Fetch` errors are contained at the page level: the scheduler records the
//! failed offset and continues, so one bad page degrades the run instead of
//! aborting it. `Store` errors are contained at the batch level by the
//! orchestrator. Only `Discovery` aborts a run outright.
//!
//! Use [`ReplicateError::is_retryable()`] to decide whether a wrapping retry
//! policy (see [`crate::resilience`]) should re-attempt the operation.

use thiserror::Error;

/// Result type alias for replication operations.
pub type Result<T> = std::result::Result<T, ReplicateError>;

/// Errors that can occur while replicating.
#[derive(Error, Debug)]
pub enum ReplicateError {
    /// Page fetch failure: network error, non-success HTTP status, or a
    /// payload that does not parse as a page.
    ///
    /// Carries the page offset for correlation. Typically retryable when the
    /// underlying cause is a transport error.
    #[error("Fetch error (offset {offset}): {message}")]
    Fetch {
        offset: u64,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// First-page fetch failed or returned no usable page.
    ///
    /// Fatal to the run: without the reported total we cannot plan the
    /// offset range.
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Destination write failure.
    ///
    /// Not retryable by the core; the orchestrator records the batch as
    /// failed and moves on to the next one.
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected internal error. Indicates a bug, not an operational issue.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReplicateError {
    /// Create a fetch error from a transport error, tagged with the offset.
    pub fn fetch(offset: u64, source: reqwest::Error) -> Self {
        Self::Fetch {
            offset,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a fetch error without an underlying transport error
    /// (e.g. an unexpected status code).
    pub fn fetch_msg(offset: u64, message: impl Into<String>) -> Self {
        Self::Fetch {
            offset,
            message: message.into(),
            source: None,
        }
    }

    /// Check if this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            // Transport failures and bad statuses are transient; a payload
            // that failed to decode will fail the same way next time.
            Self::Fetch { source, .. } => source
                .as_ref()
                .map(|e| !e.is_decode())
                .unwrap_or(true),
            Self::Discovery(_) => false,
            Self::Store(_) => false,
            Self::Config(_) => false,
            Self::Internal(_) => false,
        }
    }

    /// The offset this error relates to, if it is page-scoped.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::Fetch { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_msg_is_retryable() {
        let err = ReplicateError::fetch_msg(300, "HTTP 503");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("300"));
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn test_fetch_error_carries_offset() {
        let err = ReplicateError::fetch_msg(1200, "connection reset");
        assert_eq!(err.offset(), Some(1200));
    }

    #[test]
    fn test_discovery_not_retryable() {
        let err = ReplicateError::Discovery("first page returned no meta".to_string());
        assert!(!err.is_retryable());
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn test_store_not_retryable() {
        let err = ReplicateError::Store(sqlx::Error::RowNotFound);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_config_not_retryable() {
        let err = ReplicateError::Config("page_size must be positive".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_internal_not_retryable() {
        let err = ReplicateError::Internal("unexpected join failure".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_fetch_error_formatting() {
        let err = ReplicateError::Fetch {
            offset: 100,
            message: "timeout".to_string(),
            source: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("Fetch error"));
        assert!(msg.contains("offset 100"));
        assert!(msg.contains("timeout"));
    }
}
