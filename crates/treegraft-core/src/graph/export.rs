//! Working set export to the import format.

use std::collections::BTreeMap;

use super::{ImportDataset, ImportRecord, WorkingSet};
use crate::value::Identity;

/// Flatten a working set into one entry per chain link.
///
/// A subtype record yields an entry for itself and one for each supertype
/// link, all with the same identity. Entries are sorted by type, then
/// identity.
pub fn export(working_set: &WorkingSet) -> ImportDataset {
    let mut entries: BTreeMap<(String, Identity), ImportRecord> = BTreeMap::new();

    for record in working_set.iter() {
        for link in record.links() {
            entries
                .entry((link.type_name.clone(), link.identity))
                .or_insert_with(|| ImportRecord {
                    type_name: link.type_name.clone(),
                    identity: link.identity,
                    fields: link.fields.clone(),
                });
        }
    }

    ImportDataset {
        records: entries.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_export_flattens_chains() {
        let set: WorkingSet = [
            Record::new("DiffProposal", Identity(2))
                .with_field("diff", "+1")
                .with_parent(Record::new("Proposal", Identity(2)).with_field("title", "b")),
            Record::new("Proposal", Identity(2)).with_field("title", "b"),
            Record::new("Meeting", Identity(1)),
        ]
        .into_iter()
        .collect();

        let dataset = export(&set);

        assert_eq!(
            dataset,
            ImportDataset::new()
                .with_record(
                    ImportRecord::new("DiffProposal", Identity(2)).with_field("diff", "+1")
                )
                .with_record(ImportRecord::new("Meeting", Identity(1)))
                .with_record(ImportRecord::new("Proposal", Identity(2)).with_field("title", "b"))
        );
    }
}
