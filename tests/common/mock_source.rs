//! Mock page source for integration tests.
//!
//! Serves a fixed record set page by page with the source contract: records
//! pre-sorted by `(last_name, id)`, `meta.total_items` only on the first
//! page. Failures can be injected per offset, and completion order can be
//! perturbed with per-offset delays to exercise determinism.

use patient_replicator::fetch::{BoxFuture, PageSource};
use patient_replicator::record::{sort_records, Page, PageMeta, Record};
use patient_replicator::ReplicateError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Build a deterministic record fixture of `n` patients.
///
/// Last names cycle so the canonical sort differs from id order, which keeps
/// ordering bugs visible.
pub fn make_records(n: usize) -> Vec<Record> {
    let surnames = ["Ihetu", "Adams", "Zimmer", "Moyo", "Okafor", "Brandt"];
    (0..n as i64)
        .map(|id| Record {
            id,
            first_name: format!("First{}", id),
            last_name: surnames[(id as usize) % surnames.len()].to_string(),
            email: format!("user{}@example.com", id),
            date_of_birth: "1990-01-01".to_string(),
            created_at: "2024-01-01T00:00:00".to_string(),
            updated_at: "2024-01-02T00:00:00".to_string(),
            total_visits: id % 7,
        })
        .collect()
}

/// Scripted [`PageSource`] over an in-memory record set.
pub struct MockPageSource {
    records: Vec<Record>,
    page_size: u64,
    fail_offsets: HashSet<u64>,
    delays: HashMap<u64, Duration>,
    fetch_count: AtomicUsize,
    fetched_offsets: Mutex<Vec<u64>>,
}

impl MockPageSource {
    /// Create a source over `records`, served in canonical source order.
    pub fn new(mut records: Vec<Record>, page_size: u64) -> Self {
        sort_records(&mut records);
        Self {
            records,
            page_size,
            fail_offsets: HashSet::new(),
            delays: HashMap::new(),
            fetch_count: AtomicUsize::new(0),
            fetched_offsets: Mutex::new(Vec::new()),
        }
    }

    /// Fail every fetch of `offset`.
    pub fn failing_at(mut self, offset: u64) -> Self {
        self.fail_offsets.insert(offset);
        self
    }

    /// Delay the fetch of `offset`, perturbing completion order.
    pub fn delayed_at(mut self, offset: u64, delay: Duration) -> Self {
        self.delays.insert(offset, delay);
        self
    }

    /// Total fetches issued against this source.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Offsets fetched, in dispatch order.
    pub fn fetched_offsets(&self) -> Vec<u64> {
        self.fetched_offsets.lock().unwrap().clone()
    }
}

impl PageSource for MockPageSource {
    fn fetch_page(&self, offset: u64) -> BoxFuture<'_, Page> {
        Box::pin(async move {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            self.fetched_offsets.lock().unwrap().push(offset);

            if let Some(delay) = self.delays.get(&offset) {
                tokio::time::sleep(*delay).await;
            }

            if self.fail_offsets.contains(&offset) {
                return Err(ReplicateError::fetch_msg(offset, "injected failure"));
            }

            let start = (offset as usize).min(self.records.len());
            let end = (start + self.page_size as usize).min(self.records.len());
            let meta = (offset == 0).then_some(PageMeta {
                total_items: self.records.len() as u64,
            });

            Ok(Page {
                data: self.records[start..end].to_vec(),
                meta,
            })
        })
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }
}
