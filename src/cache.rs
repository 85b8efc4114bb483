use crate::scheme::TableScheme;
use dashmap::DashMap;
use std::sync::Arc;

/// Decoded schemes keyed by `"{db}.{table}"`.
///
/// Entries are shared as `Arc`s and replaced whole, so a reader never sees a
/// partially built scheme. The catalog forgets an entry whenever it creates
/// or drops the table behind it.
#[derive(Debug, Default)]
pub struct SchemeCache {
    entries: DashMap<String, Arc<TableScheme>>,
}

pub fn full_name(db_name: &str, tbl_name: &str) -> String {
    format!("{db_name}.{tbl_name}")
}

impl SchemeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, db_name: &str, tbl_name: &str) -> Option<Arc<TableScheme>> {
        self.entries
            .get(&full_name(db_name, tbl_name))
            .map(|e| Arc::clone(e.value()))
    }

    pub fn insert(&self, db_name: &str, tbl_name: &str, scheme: Arc<TableScheme>) {
        self.entries.insert(full_name(db_name, tbl_name), scheme);
    }

    /// Drop the entry for one table. Call after any DDL touching it.
    pub fn forget(&self, db_name: &str, tbl_name: &str) -> bool {
        self.entries.remove(&full_name(db_name, tbl_name)).is_some()
    }

    pub fn forget_database(&self, db_name: &str) {
        let prefix = format!("{db_name}.");
        self.entries.retain(|k, _| !k.starts_with(&prefix));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
