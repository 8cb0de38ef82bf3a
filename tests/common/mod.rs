//! Shared test utilities for integration tests.
//!
//! This module provides:
//! - A scripted page source with per-offset failure injection
//! - Record builders for deterministic fixtures

pub mod mock_source;

pub use mock_source::*;
