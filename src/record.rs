//! Typed records and pages from the source API.
//!
//! The source speaks JSON: `{ "data": [Record...], "meta": { "total_items": N } }`.
//! Everything is validated and converted here, once, at the API boundary;
//! nothing downstream touches untyped JSON.
//!
//! Dates and timestamps are carried as strings. The source emits them
//! pre-formatted and the destination stores them verbatim; parsing them would
//! add failure modes without adding meaning.

use serde::{Deserialize, Serialize};

/// One patient record as reported by the source.
///
/// Identity is `id`; every other field is mutable between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub total_visits: i64,
}

/// Pagination metadata. Only meaningful on the first page (offset 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total_items: u64,
}

/// One fetched page: an ordered slice of records plus optional metadata.
///
/// Transient; the orchestrator extracts the records and discards the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub data: Vec<Record>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

impl Page {
    /// Total item count reported by the source, if present.
    pub fn total_items(&self) -> Option<u64> {
        self.meta.map(|m| m.total_items)
    }

    /// Number of records on this page.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the page carries no records.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Sort records into the canonical replication order.
///
/// The source sorts by `last_name` ascending; `id` is the stable tiebreaker
/// so that batch boundaries are reproducible regardless of the order pages
/// completed in.
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(|a, b| {
        a.last_name
            .cmp(&b.last_name)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, last_name: &str) -> Record {
        Record {
            id,
            first_name: "Test".to_string(),
            last_name: last_name.to_string(),
            email: format!("user{}@example.com", id),
            date_of_birth: "1990-01-01".to_string(),
            created_at: "2024-01-01T00:00:00".to_string(),
            updated_at: "2024-01-02T00:00:00".to_string(),
            total_visits: 3,
        }
    }

    #[test]
    fn test_parse_first_page_payload() {
        let body = r#"{
            "data": [
                {"id": 1, "first_name": "Emmanuel", "last_name": "Ihetu",
                 "email": "user1@example.com", "date_of_birth": "1990-01-01",
                 "created_at": "2024-01-01T00:00:00",
                 "updated_at": "2024-01-02T00:00:00", "total_visits": 5}
            ],
            "meta": {"total_items": 250}
        }"#;

        let page: Page = serde_json::from_str(body).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.total_items(), Some(250));
        assert_eq!(page.data[0].id, 1);
        assert_eq!(page.data[0].last_name, "Ihetu");
        assert_eq!(page.data[0].total_visits, 5);
    }

    #[test]
    fn test_parse_page_without_meta() {
        let body = r#"{"data": []}"#;
        let page: Page = serde_json::from_str(body).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_items(), None);
    }

    #[test]
    fn test_parse_page_with_missing_optional_fields() {
        // Sparse records still parse; optional string fields default to empty.
        let body = r#"{"data": [{"id": 7, "first_name": "A", "last_name": "B",
                                 "email": "a@b.c"}]}"#;
        let page: Page = serde_json::from_str(body).unwrap();
        assert_eq!(page.data[0].date_of_birth, "");
        assert_eq!(page.data[0].total_visits, 0);
    }

    #[test]
    fn test_parse_rejects_malformed_payload() {
        let result: std::result::Result<Page, _> = serde_json::from_str(r#"{"items": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_sort_records_by_last_name() {
        let mut records = vec![record(1, "Zimmer"), record(2, "Adams"), record(3, "Moyo")];
        sort_records(&mut records);
        let names: Vec<&str> = records.iter().map(|r| r.last_name.as_str()).collect();
        assert_eq!(names, vec!["Adams", "Moyo", "Zimmer"]);
    }

    #[test]
    fn test_sort_records_ties_broken_by_id() {
        let mut records = vec![record(9, "Adams"), record(2, "Adams"), record(5, "Adams")];
        sort_records(&mut records);
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn test_sort_records_is_deterministic_for_any_input_order() {
        let mut a = vec![record(1, "B"), record(2, "A"), record(3, "C")];
        let mut b = vec![record(3, "C"), record(1, "B"), record(2, "A")];
        sort_records(&mut a);
        sort_records(&mut b);
        assert_eq!(a, b);
    }
}
