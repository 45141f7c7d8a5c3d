// Test support utilities for both unit and integration tests

use crate::db::{CatalogError, CatalogRow, CatalogStore, StringRecord};
use crate::preview::{SECTION_HEADER_LEN, SECTION_MAGIC};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Mock catalog store for testing
///
/// Serves fixture rows keyed by query label instead of running SQL.
/// Labels with no fixture return no rows.
#[derive(Default)]
pub struct MockCatalogStore {
    rows: HashMap<String, Vec<CatalogRow>>,
    records: HashMap<String, Vec<StringRecord>>,
    failing: HashSet<String>,
    executed: Mutex<Vec<String>>,
}

impl MockCatalogStore {
    /// Create a new mock catalog store with no fixtures
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `rows` for `query` calls with this label
    pub fn with_rows(mut self, label: &str, rows: Vec<CatalogRow>) -> Self {
        self.rows.insert(label.to_string(), rows);
        self
    }

    /// Serve `records` for `query_string_map` calls with this label
    pub fn with_records(mut self, label: &str, records: Vec<StringRecord>) -> Self {
        self.records.insert(label.to_string(), records);
        self
    }

    /// Reject any query with this label
    pub fn failing(mut self, label: &str) -> Self {
        self.failing.insert(label.to_string());
        self
    }

    /// Labels of every query run so far, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn record_call(&self, label: &str) -> Result<(), CatalogError> {
        self.executed.lock().unwrap().push(label.to_string());
        if self.failing.contains(label) {
            return Err(CatalogError::query(
                label,
                sqlx::Error::Protocol(format!("mock failure for {}", label)),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogStore for MockCatalogStore {
    async fn query(&self, label: &str, _sql: &str) -> Result<Vec<CatalogRow>, CatalogError> {
        self.record_call(label)?;
        Ok(self.rows.get(label).cloned().unwrap_or_default())
    }

    async fn query_string_map(
        &self,
        label: &str,
        _sql: &str,
    ) -> Result<Vec<StringRecord>, CatalogError> {
        self.record_call(label)?;
        Ok(self.records.get(label).cloned().unwrap_or_default())
    }
}

/// Encode one cached-preview section in the layout `preview::parse_sections`
/// reads, with the name NUL-padded to a multiple of 8 bytes
pub fn encode_preview_section(name: &str, kind: u8, data: &[u8], padding: usize) -> Vec<u8> {
    let name_len = (name.len() / 8 + 1) * 8;
    let header_len = SECTION_HEADER_LEN + name_len;

    let mut out = Vec::with_capacity(header_len + data.len() + padding);
    out.extend_from_slice(SECTION_MAGIC);
    out.extend_from_slice(&(header_len as u16).to_be_bytes());
    out.push(1);
    out.push(kind);
    out.extend_from_slice(&(data.len() as u64).to_be_bytes());
    out.extend_from_slice(&(padding as u64).to_be_bytes());
    out.extend_from_slice(name.as_bytes());
    out.resize(header_len, 0);
    out.extend_from_slice(data);
    out.resize(header_len + data.len() + padding, 0);
    out
}
