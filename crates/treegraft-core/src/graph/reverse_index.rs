//! Per-run index of reverse relation holders.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Error;
use crate::record::Record;
use crate::storage::Storage;
use crate::value::Identity;

/// Records holding a relation field, grouped by the identity they point at.
///
/// Each (source type, field) pair is scanned once, the first time it is
/// asked for. The index reflects storage as of that scan, so it must not
/// outlive a phase that writes to the holders' type.
#[derive(Debug, Default)]
pub(crate) struct ReverseIndex {
    by_relation: BTreeMap<(String, String), BTreeMap<Identity, Vec<Record>>>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of `source` whose `field` points at `target`.
    pub fn holders(
        &mut self,
        storage: &dyn Storage,
        source: &str,
        field: &str,
        target: Identity,
    ) -> Result<&[Record], Error> {
        let key = (source.to_string(), field.to_string());
        if !self.by_relation.contains_key(&key) {
            let mut index: BTreeMap<Identity, Vec<Record>> = BTreeMap::new();
            for record in storage.records(source)? {
                let targets: BTreeSet<Identity> = match record.get(field) {
                    Some(value) => value.referenced().into_iter().collect(),
                    None => continue,
                };
                for target in targets {
                    index.entry(target).or_default().push(record.clone());
                }
            }
            self.by_relation.insert(key.clone(), index);
        }

        Ok(self
            .by_relation
            .get(&key)
            .and_then(|index| index.get(&target))
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_holders_match_referencing() {
        let mut storage = MemoryStorage::new();
        storage
            .insert(
                &Record::new("Proposal", Identity(1))
                    .with_field("tags", vec![Identity(1), Identity(1)]),
            )
            .unwrap();
        storage
            .insert(&Record::new("Proposal", Identity(2)).with_field("tags", vec![Identity(2)]))
            .unwrap();
        storage.insert(&Record::new("Proposal", Identity(3))).unwrap();

        let mut index = ReverseIndex::new();
        let holders: Vec<Identity> = index
            .holders(&storage, "Proposal", "tags", Identity(1))
            .unwrap()
            .iter()
            .map(|r| r.identity)
            .collect();
        assert_eq!(holders, vec![Identity(1)]);

        let expected: Vec<Identity> = storage
            .referencing("Proposal", "tags", Identity(2))
            .unwrap()
            .iter()
            .map(|r| r.identity)
            .collect();
        let holders: Vec<Identity> = index
            .holders(&storage, "Proposal", "tags", Identity(2))
            .unwrap()
            .iter()
            .map(|r| r.identity)
            .collect();
        assert_eq!(holders, expected);
        assert!(index
            .holders(&storage, "Proposal", "tags", Identity(9))
            .unwrap()
            .is_empty());
    }
}
