//! Batch assembly for destination writes.
//!
//! Pure partitioning: the sorted record sequence is split into contiguous
//! batches of at most `batch_size` records each, preserving order within and
//! across batches. A batch is the unit of atomic application to the store.
//!
//! ```text
//! sorted records ──▶ assemble(batch_size) ──▶ [Batch, Batch, ...] ──▶ store
//! ```

use crate::record::Record;

/// A bounded-size ordered group of records, applied to the destination as
/// one logical write. Created here, consumed once by the store.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    /// Records in this batch, in canonical order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records in this batch.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the batch carries no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Record>> for Batch {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

/// Split `records` into contiguous batches of at most `batch_size`.
///
/// Produces `ceil(records.len() / batch_size)` batches, each full except
/// possibly the last. Order is preserved. `batch_size` of zero yields no
/// batches rather than looping forever; callers validate it upstream.
pub fn assemble(records: Vec<Record>, batch_size: usize) -> Vec<Batch> {
    if batch_size == 0 || records.is_empty() {
        return Vec::new();
    }

    let mut batches = Vec::with_capacity(records.len().div_ceil(batch_size));
    let mut remaining = records;

    while remaining.len() > batch_size {
        let tail = remaining.split_off(batch_size);
        batches.push(Batch::from(std::mem::replace(&mut remaining, tail)));
    }
    batches.push(Batch::from(remaining));

    batches
}
