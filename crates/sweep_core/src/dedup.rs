use std::collections::HashMap;

use crate::record::SubdomainRecord;

/// Session-scoped set of accepted hostnames, keyed by domain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DedupStore {
    entries: HashMap<String, SubdomainRecord>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns whether the record was newly inserted. An existing key is left
    /// untouched.
    pub fn insert(&mut self, record: SubdomainRecord) -> bool {
        if self.entries.contains_key(record.key()) {
            return false;
        }
        self.entries.insert(record.key().to_owned(), record);
        true
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records sorted by domain; the order persisted and exported.
    pub fn records(&self) -> Vec<SubdomainRecord> {
        let mut records: Vec<_> = self.entries.values().cloned().collect();
        records.sort_by(|a, b| a.domain.cmp(&b.domain));
        records
    }

    /// Rebuilds the store from a snapshot; later duplicates of a key are ignored.
    pub fn restore(records: impl IntoIterator<Item = SubdomainRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }
}
