//! In-memory storage backend.

use std::collections::BTreeMap;

use super::{Row, Storage};
use crate::error::Error;
use crate::value::Identity;

/// Storage kept entirely in process memory.
///
/// Sequences follow the highest identity written per type, so rows inserted
/// with explicit identities never collide with allocated ones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    rows: BTreeMap<(String, Identity), Row>,
    sequences: BTreeMap<String, u64>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows across all types.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows, ordered by type then identity.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }
}

impl Storage for MemoryStorage {
    fn allocate_identity(&mut self, type_name: &str) -> Result<Identity, Error> {
        let seq = self.sequences.entry(type_name.to_string()).or_insert(0);
        *seq += 1;
        Ok(Identity(*seq))
    }

    fn put_row(&mut self, row: Row) -> Result<(), Error> {
        let seq = self.sequences.entry(row.type_name.clone()).or_insert(0);
        *seq = (*seq).max(row.identity.get());
        self.rows
            .insert((row.type_name.clone(), row.identity), row);
        Ok(())
    }

    fn get_row(&self, type_name: &str, identity: Identity) -> Result<Option<Row>, Error> {
        Ok(self.rows.get(&(type_name.to_string(), identity)).cloned())
    }

    fn scan_rows(&self, type_name: &str) -> Result<Vec<Row>, Error> {
        let start = (type_name.to_string(), Identity(0));
        let end = (type_name.to_string(), Identity(u64::MAX));
        Ok(self.rows.range(start..=end).map(|(_, row)| row.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(type_name: &str, id: u64) -> Row {
        Row {
            type_name: type_name.into(),
            identity: Identity(id),
            parent_type: None,
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn test_sequences_are_per_type() {
        let mut storage = MemoryStorage::new();
        storage.put_row(row("Tag", 10)).unwrap();

        assert_eq!(storage.allocate_identity("Tag").unwrap(), Identity(11));
        assert_eq!(storage.allocate_identity("User").unwrap(), Identity(1));
    }

    #[test]
    fn test_scan_is_type_scoped() {
        let mut storage = MemoryStorage::new();
        storage.put_row(row("Tag", 2)).unwrap();
        storage.put_row(row("Tag", 1)).unwrap();
        storage.put_row(row("Tags", 1)).unwrap();
        storage.put_row(row("Ta", 1)).unwrap();

        let ids: Vec<u64> = storage
            .scan_rows("Tag")
            .unwrap()
            .iter()
            .map(|r| r.identity.get())
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(storage.len(), 4);
    }
}
