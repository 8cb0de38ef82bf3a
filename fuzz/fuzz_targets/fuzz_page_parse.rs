//! Fuzz target for page payload parsing.
//!
//! This tests that deserializing arbitrary bytes as a source page never
//! panics; it either yields a typed `Page` or a serde error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use patient_replicator::record::Page;

fuzz_target!(|data: &[u8]| {
    // Should never panic
    let _ = serde_json::from_slice::<Page>(data);
});
