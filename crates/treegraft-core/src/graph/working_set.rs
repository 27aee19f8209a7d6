//! Working sets: records grouped by type.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::IdentityMap;
use crate::record::Record;
use crate::value::Identity;

/// A closed set of records grouped by type, keyed by identity.
///
/// A subtype record is stored under its own type; its supertype views live
/// under their respective types with the same identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingSet {
    records: BTreeMap<String, BTreeMap<Identity, Record>>,
}

impl WorkingSet {
    /// Create an empty working set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Returns false if (type, identity) was already present.
    pub fn insert(&mut self, record: Record) -> bool {
        let by_id = self.records.entry(record.type_name.clone()).or_default();
        if by_id.contains_key(&record.identity) {
            return false;
        }
        by_id.insert(record.identity, record);
        true
    }

    /// Replace a record, inserting it if absent.
    pub fn replace(&mut self, record: Record) {
        self.records
            .entry(record.type_name.clone())
            .or_default()
            .insert(record.identity, record);
    }

    /// Check if (type, identity) is present.
    pub fn contains(&self, type_name: &str, identity: Identity) -> bool {
        self.records
            .get(type_name)
            .is_some_and(|by_id| by_id.contains_key(&identity))
    }

    /// Get a record.
    pub fn get(&self, type_name: &str, identity: Identity) -> Option<&Record> {
        self.records.get(type_name)?.get(&identity)
    }

    /// Remove a record.
    pub fn remove(&mut self, type_name: &str, identity: Identity) -> Option<Record> {
        let by_id = self.records.get_mut(type_name)?;
        let removed = by_id.remove(&identity);
        if by_id.is_empty() {
            self.records.remove(type_name);
        }
        removed
    }

    /// Types with at least one record.
    pub fn types(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }

    /// Records of one type, in ascending identity order.
    pub fn records_of(&self, type_name: &str) -> impl Iterator<Item = &Record> {
        self.records
            .get(type_name)
            .into_iter()
            .flat_map(|by_id| by_id.values())
    }

    /// Every record, by type then identity.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values().flat_map(|by_id| by_id.values())
    }

    /// Identities present for one type.
    pub fn identities_of(&self, type_name: &str) -> BTreeSet<Identity> {
        self.records_of(type_name).map(|r| r.identity).collect()
    }

    /// All identities grouped by type.
    pub fn identities(&self) -> IdentityMap {
        self.records
            .iter()
            .map(|(type_name, by_id)| (type_name.clone(), by_id.keys().copied().collect()))
            .collect()
    }

    /// Number of records of one type.
    pub fn count(&self, type_name: &str) -> usize {
        self.records.get(type_name).map_or(0, BTreeMap::len)
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records that are not shadowed by a subtype record of the same identity.
    ///
    /// A subtype record materializes its supertype portion itself, so the
    /// supertype views must not be processed on their own.
    pub fn independent(&self) -> WorkingSet {
        let shadowed: BTreeSet<(&str, Identity)> = self
            .iter()
            .flat_map(|record| {
                record
                    .links()
                    .skip(1)
                    .map(move |link| (link.type_name.as_str(), record.identity))
            })
            .collect();

        let mut independent = WorkingSet::new();
        for record in self.iter() {
            if !shadowed.contains(&(record.type_name.as_str(), record.identity)) {
                independent.insert(record.clone());
            }
        }
        independent
    }
}

impl FromIterator<Record> for WorkingSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut set = WorkingSet::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(id: u64) -> Record {
        Record::new("DiffProposal", Identity(id)).with_parent(Record::new("Proposal", Identity(id)))
    }

    #[test]
    fn test_insert_deduplicates() {
        let mut set = WorkingSet::new();
        assert!(set.insert(Record::new("Tag", Identity(1))));
        assert!(!set.insert(Record::new("Tag", Identity(1))));
        assert!(set.insert(Record::new("Tag", Identity(2))));

        assert_eq!(set.count("Tag"), 2);
        assert_eq!(set.len(), 2);
        assert_eq!(set.types(), vec!["Tag"]);
    }

    #[test]
    fn test_independent_drops_shadowed_views() {
        let set: WorkingSet = [
            diff(2),
            Record::new("Proposal", Identity(2)),
            Record::new("Proposal", Identity(3)),
        ]
        .into_iter()
        .collect();

        let independent = set.independent();
        assert!(independent.contains("DiffProposal", Identity(2)));
        assert!(!independent.contains("Proposal", Identity(2)));
        assert!(independent.contains("Proposal", Identity(3)));
    }

    #[test]
    fn test_remove_prunes_empty_types() {
        let mut set = WorkingSet::new();
        set.insert(Record::new("Tag", Identity(1)));

        assert!(set.remove("Tag", Identity(1)).is_some());
        assert!(set.is_empty());
        assert!(set.identities().is_empty());
    }
}
