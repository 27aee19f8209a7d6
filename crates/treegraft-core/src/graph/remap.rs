//! Old-identity to new-record mapping built during a run.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Error;
use crate::record::Record;
use crate::value::Identity;

/// Outcome of resolving an original identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The identity was materialized (or matched) under this new identity.
    Remapped(Identity),
    /// The identity is outside the working set; keep the reference as is.
    External,
}

/// Per-type bijection between original identities and their counterparts.
///
/// Every chain link of a registered record is registered, so a reference
/// typed as a supertype resolves to the same counterpart as the subtype.
#[derive(Debug, Clone, Default)]
pub struct RemapTable {
    /// (type, original identity) -> new identity.
    forward: BTreeMap<(String, Identity), Identity>,
    /// (type, new identity) -> snapshot of the original link view.
    originals: BTreeMap<(String, Identity), Record>,
    /// (type, new identity) pairs created in this run.
    created: BTreeSet<(String, Identity)>,
}

impl RemapTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly created record as the counterpart of `original`.
    pub fn register(&mut self, original: &Record, new: &Record) -> Result<(), Error> {
        self.insert(original, new.identity, true)
    }

    /// Register an existing record reused in place of `original`.
    ///
    /// Reused records resolve like new ones but [`is_new`](Self::is_new)
    /// is false for them.
    pub fn register_existing(&mut self, original: &Record, existing: &Record) -> Result<(), Error> {
        self.insert(original, existing.identity, false)
    }

    fn insert(&mut self, original: &Record, new: Identity, created: bool) -> Result<(), Error> {
        for link in original.links() {
            let type_name = link.type_name.clone();
            if self.forward.contains_key(&(type_name.clone(), original.identity)) {
                return Err(Error::RemapConflict {
                    type_name,
                    identity: original.identity,
                });
            }
            if self.originals.contains_key(&(type_name.clone(), new)) {
                return Err(Error::RemapConflict {
                    type_name,
                    identity: new,
                });
            }
        }

        for link in original.links() {
            self.forward
                .insert((link.type_name.clone(), original.identity), new);
            self.originals
                .insert((link.type_name.clone(), new), link.clone());
            if created {
                self.created.insert((link.type_name.clone(), new));
            }
        }
        Ok(())
    }

    /// Resolve an original identity of `type_name`.
    pub fn resolve(&self, type_name: &str, original: Identity) -> Resolution {
        match self.forward.get(&(type_name.to_string(), original)) {
            Some(new) => Resolution::Remapped(*new),
            None => Resolution::External,
        }
    }

    /// Resolve an identity that must already have been registered.
    pub fn require(&self, type_name: &str, original: Identity) -> Result<Identity, Error> {
        match self.resolve(type_name, original) {
            Resolution::Remapped(new) => Ok(new),
            Resolution::External => Err(Error::UnresolvedIdentity {
                type_name: type_name.to_string(),
                identity: original,
            }),
        }
    }

    /// Check if an original identity has been registered.
    pub fn contains(&self, type_name: &str, original: Identity) -> bool {
        self.forward.contains_key(&(type_name.to_string(), original))
    }

    /// The original record a counterpart was registered for.
    pub fn get_original(&self, type_name: &str, new: Identity) -> Option<&Record> {
        self.originals.get(&(type_name.to_string(), new))
    }

    /// Check if a counterpart was created in this run (not reused).
    pub fn is_new(&self, type_name: &str, identity: Identity) -> bool {
        self.created.contains(&(type_name.to_string(), identity))
    }

    /// Every (type, original, counterpart) triple, by type then original.
    pub fn mappings(&self) -> impl Iterator<Item = (&str, Identity, Identity)> {
        self.forward
            .iter()
            .map(|((type_name, old), new)| (type_name.as_str(), *old, *new))
    }

    /// Number of registered (type, identity) pairs.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Check if nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Number of registered pairs that were reused rather than created.
    pub fn reused(&self) -> usize {
        self.forward.len() - self.created.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(id: u64) -> Record {
        Record::new("DiffProposal", Identity(id))
            .with_field("base", "b")
            .with_parent(Record::new("Proposal", Identity(id)).with_field("title", "t"))
    }

    #[test]
    fn test_register_covers_chain() {
        let mut table = RemapTable::new();
        table.register(&diff(2), &diff(10)).unwrap();

        assert_eq!(table.resolve("DiffProposal", Identity(2)), Resolution::Remapped(Identity(10)));
        assert_eq!(table.resolve("Proposal", Identity(2)), Resolution::Remapped(Identity(10)));
        assert_eq!(table.resolve("Proposal", Identity(3)), Resolution::External);
        assert!(table.is_new("Proposal", Identity(10)));

        let original = table.get_original("Proposal", Identity(10)).unwrap();
        assert_eq!(original.type_name, "Proposal");
        assert_eq!(original.identity, Identity(2));
    }

    #[test]
    fn test_register_twice_conflicts() {
        let mut table = RemapTable::new();
        table.register(&diff(2), &diff(10)).unwrap();

        let err = table
            .register(&Record::new("Proposal", Identity(2)), &Record::new("Proposal", Identity(11)))
            .unwrap_err();
        assert!(matches!(err, Error::RemapConflict { .. }));
        // nothing half-registered
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_existing_is_not_new() {
        let mut table = RemapTable::new();
        let existing = Record::new("Organisation", Identity(5));
        table
            .register_existing(&Record::new("Organisation", Identity(1)), &existing)
            .unwrap();

        assert_eq!(table.require("Organisation", Identity(1)).unwrap(), Identity(5));
        assert!(!table.is_new("Organisation", Identity(5)));
        assert_eq!(table.reused(), 1);
        assert!(matches!(
            table.require("Organisation", Identity(2)),
            Err(Error::UnresolvedIdentity { .. })
        ));
    }

    #[test]
    fn test_two_originals_cannot_share_a_counterpart() {
        let mut table = RemapTable::new();
        let existing = Record::new("Organisation", Identity(5));
        table
            .register_existing(&Record::new("Organisation", Identity(1)), &existing)
            .unwrap();

        let err = table
            .register_existing(&Record::new("Organisation", Identity(2)), &existing)
            .unwrap_err();
        assert!(matches!(err, Error::RemapConflict { .. }));
    }
}
