//! Importing an external dataset with reuse of existing records.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument, warn};

use super::materialize::{Materializer, RunReport};
use super::{Directives, HookContext, HookRunner, ImportDataset, ImportRecord, RemapTable, WorkingSet};
use crate::catalog::TypeCatalog;
use crate::error::Error;
use crate::record::Record;
use crate::storage::Storage;
use crate::value::{Identity, Value};

/// Result of an import.
#[derive(Debug)]
pub struct ImportOutcome {
    /// Records created by the import, with their supertype views.
    pub working_set: WorkingSet,
    /// Mapping from incoming identities to created or reused records.
    pub remap: RemapTable,
    /// Run summary.
    pub report: RunReport,
}

/// Materializes an external dataset into a store.
///
/// The dataset need not be ordered. Every subtype entry must come with one
/// entry per supertype carrying the same identity. Incoming records matched
/// by an auto-find lookup are reused and never written; references to them
/// resolve to the existing record. References to identities absent from the
/// batch are kept verbatim.
pub struct Importer<'a> {
    catalog: &'a dyn TypeCatalog,
    dataset: ImportDataset,
    /// Lookup fields per type, in registration order.
    auto_find: Vec<(String, Vec<String>)>,
    directives: Directives,
    hooks: HookRunner,
}

impl std::fmt::Debug for Importer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Importer")
            .field("dataset", &self.dataset)
            .field("auto_find", &self.auto_find)
            .field("directives", &self.directives)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl<'a> Importer<'a> {
    /// Create an importer for a parsed dataset.
    pub fn new(catalog: &'a dyn TypeCatalog, dataset: ImportDataset) -> Self {
        Self {
            catalog,
            dataset,
            auto_find: Vec::new(),
            directives: Directives::new(),
            hooks: HookRunner::new(),
        }
    }

    /// Create an importer from the JSON wire format.
    pub fn from_serialized(catalog: &'a dyn TypeCatalog, json: &str) -> Result<Self, Error> {
        Ok(Self::new(catalog, ImportDataset::from_json(json)?))
    }

    /// Reuse existing records of `type_name` whose `fields` match.
    ///
    /// Fields are tried in order; a record matched through an earlier field
    /// is not looked up again. Null and falsy values never match.
    pub fn add_auto_find_existing(
        &mut self,
        type_name: &str,
        fields: &[&str],
    ) -> Result<&mut Self, Error> {
        if !self.catalog.contains(type_name) {
            return Err(Error::UnknownType(type_name.to_string()));
        }
        for field in fields {
            if !self.catalog.has_field(type_name, field) {
                return Err(Error::InvalidDirective {
                    type_name: type_name.to_string(),
                    field: field.to_string(),
                    reason: "auto-find field is not declared".into(),
                });
            }
        }

        let fields = fields.iter().map(|f| f.to_string());
        match self.auto_find.iter_mut().find(|(t, _)| t == type_name) {
            Some((_, existing)) => existing.extend(fields),
            None => self.auto_find.push((type_name.to_string(), fields.collect())),
        }
        Ok(self)
    }

    /// Clear relation fields instead of remapping them.
    pub fn add_clear(&mut self, type_name: &str, fields: &[&str]) -> Result<&mut Self, Error> {
        self.directives.add_clear(self.catalog, type_name, fields)?;
        Ok(self)
    }

    /// Force `type_name` to be created after `depends_on`.
    pub fn add_explicit_dependency(
        &mut self,
        type_name: &str,
        depends_on: &[&str],
    ) -> Result<&mut Self, Error> {
        self.directives
            .add_explicit_dependency(self.catalog, type_name, depends_on)?;
        Ok(self)
    }

    /// Register a hook run on the drafts of `type_name` before they are written.
    pub fn add_pre_save<F>(&mut self, type_name: &str, hook: F) -> Result<&mut Self, Error>
    where
        F: FnMut(&mut HookContext<'_>, &mut [Record]) -> Result<(), Error> + 'static,
    {
        self.hooks.add_pre_save(self.catalog, type_name, hook)?;
        Ok(self)
    }

    /// Register a hook run on the new records of `type_name`.
    pub fn add_post_save<F>(&mut self, type_name: &str, hook: F) -> Result<&mut Self, Error>
    where
        F: FnMut(&mut HookContext<'_>, &[Record]) -> Result<(), Error> + 'static,
    {
        self.hooks.add_post_save(self.catalog, type_name, hook)?;
        Ok(self)
    }

    /// Register a hook run once every record is written and rewired.
    pub fn add_pre_commit<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnMut(&mut HookContext<'_>) -> Result<(), Error> + 'static,
    {
        self.hooks.add_pre_commit(hook);
        self
    }

    /// The dataset being imported.
    pub fn dataset(&self) -> &ImportDataset {
        &self.dataset
    }

    /// Import the dataset into `storage`.
    #[instrument(skip_all, fields(entries = self.dataset.len()))]
    pub fn run(&mut self, storage: &mut dyn Storage) -> Result<ImportOutcome, Error> {
        let source = self.assemble()?;
        let mut remap = RemapTable::new();
        let reused = self.find_existing(&*storage, &source, &mut remap)?;

        let mut materializer = Materializer {
            catalog: self.catalog,
            directives: &self.directives,
            hooks: &mut self.hooks,
        };
        let (created, mut report) = materializer.run(storage, &source, &mut remap)?;
        report.reused = reused;

        info!(
            created = report.total_created(),
            reused = report.total_reused(),
            patched = report.deferred_patched,
            "import finished"
        );

        Ok(ImportOutcome {
            working_set: created,
            remap,
            report,
        })
    }

    /// Group entries by (type, identity) and assemble inheritance chains.
    fn assemble(&self) -> Result<WorkingSet, Error> {
        let mut entries: BTreeMap<(String, Identity), &ImportRecord> = BTreeMap::new();
        for entry in &self.dataset.records {
            if !self.catalog.contains(&entry.type_name) {
                return Err(Error::UnknownType(entry.type_name.clone()));
            }
            if entries
                .insert((entry.type_name.clone(), entry.identity), entry)
                .is_some()
            {
                return Err(Error::Integrity {
                    type_name: entry.type_name.clone(),
                    identity: entry.identity,
                    reason: "entry appears twice in the batch".into(),
                });
            }
        }

        let mut source = WorkingSet::new();
        for (type_name, identity) in entries.keys() {
            source.insert(self.chain_record(&entries, type_name, *identity)?);
        }
        debug!(records = source.len(), "import batch assembled");
        Ok(source)
    }

    fn chain_record(
        &self,
        entries: &BTreeMap<(String, Identity), &ImportRecord>,
        type_name: &str,
        identity: Identity,
    ) -> Result<Record, Error> {
        let entry = entries
            .get(&(type_name.to_string(), identity))
            .ok_or_else(|| Error::Integrity {
                type_name: type_name.to_string(),
                identity,
                reason: "entry missing from the batch".into(),
            })?;

        let mut record = Record::new(type_name, identity);
        record.fields = entry.fields.clone();
        if let Some(identity_field) = self.catalog.identity_field(type_name) {
            record.fields.remove(identity_field);
        }

        if let Some(parent) = self.catalog.parent_type(type_name) {
            if !entries.contains_key(&(parent.to_string(), identity)) {
                return Err(Error::Integrity {
                    type_name: type_name.to_string(),
                    identity,
                    reason: format!("no {parent} entry with the same identity in the batch"),
                });
            }
            record.parent = Some(Box::new(self.chain_record(entries, parent, identity)?));
        }

        Ok(record)
    }

    /// Register incoming records matched by auto-find as reused.
    ///
    /// Supertype views of an incoming subtype record are not candidates: the
    /// subtype chain is created whole, so reusing one of its links would
    /// leave the chain half registered.
    fn find_existing(
        &self,
        storage: &dyn Storage,
        source: &WorkingSet,
        remap: &mut RemapTable,
    ) -> Result<BTreeMap<String, usize>, Error> {
        let mut reused: BTreeMap<String, usize> = BTreeMap::new();
        let candidates = source.independent();

        for (type_name, fields) in &self.auto_find {
            let identity_field = self.catalog.identity_field(type_name);

            for field in fields {
                let by_identity = identity_field == Some(field.as_str());
                if by_identity {
                    warn!(
                        type_name = %type_name,
                        "auto-find by identity compares identities from different stores"
                    );
                }

                let mut seen: Vec<(Value, Identity)> = Vec::new();
                for record in candidates.records_of(type_name) {
                    if remap.contains(type_name, record.identity) {
                        continue;
                    }

                    let existing = if by_identity {
                        storage.get(type_name, record.identity)?
                    } else {
                        let value = match record.get(field) {
                            Some(value) if value.is_truthy() => value.clone(),
                            _ => continue,
                        };
                        if let Some((_, other)) = seen.iter().find(|(v, _)| *v == value) {
                            return Err(Error::AmbiguousLookup {
                                type_name: type_name.clone(),
                                field: field.clone(),
                                reason: format!(
                                    "incoming #{other} and #{} share the value {value}",
                                    record.identity
                                ),
                            });
                        }
                        let mut found = storage.find(type_name, field, &value)?;
                        if found.len() > 1 {
                            return Err(Error::AmbiguousLookup {
                                type_name: type_name.clone(),
                                field: field.clone(),
                                reason: format!("{} existing records match {value}", found.len()),
                            });
                        }
                        seen.push((value, record.identity));
                        found.pop()
                    };

                    if let Some(existing) = existing {
                        debug!(
                            type_name = %type_name,
                            field = %field,
                            incoming = %record.identity,
                            existing = %existing.identity,
                            "reusing existing record"
                        );
                        remap.register_existing(record, &existing)?;
                        *reused.entry(type_name.clone()).or_default() += 1;
                    }
                }
            }
        }

        Ok(reused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, FieldDef, RelationDef, TypeDef};
    use crate::storage::MemoryStorage;

    fn catalog() -> Catalog {
        Catalog::new()
            .with_type(TypeDef::new("Organisation").with_field(FieldDef::new("name")))
            .with_type(TypeDef::new("Meeting").with_field(FieldDef::new("name")))
            .with_type(TypeDef::new("Proposal").with_field(FieldDef::new("title")))
            .with_type(TypeDef::new("DiffProposal").extends("Proposal"))
            .with_relation(RelationDef::one("Meeting", "organisation", "Organisation").required())
            .with_relation(RelationDef::one("Proposal", "meeting", "Meeting").required())
    }

    fn dataset() -> ImportDataset {
        ImportDataset::new()
            .with_record(ImportRecord::new("Proposal", Identity(7)).with_field("meeting", Identity(3)))
            .with_record(
                ImportRecord::new("Meeting", Identity(3))
                    .with_field("name", "AGM")
                    .with_field("organisation", Identity(1)),
            )
            .with_record(ImportRecord::new("Organisation", Identity(1)).with_field("name", "Org"))
    }

    #[test]
    fn test_unordered_import() {
        let catalog = catalog();
        let mut storage = MemoryStorage::new();

        let outcome = Importer::new(&catalog, dataset()).run(&mut storage).unwrap();

        let proposal_id = outcome.remap.require("Proposal", Identity(7)).unwrap();
        let meeting_id = outcome.remap.require("Meeting", Identity(3)).unwrap();
        let proposal = storage.get("Proposal", proposal_id).unwrap().unwrap();
        assert_eq!(proposal.get("meeting"), Some(&Value::Ref(meeting_id)));
        assert_eq!(outcome.report.total_created(), 3);
    }

    #[test]
    fn test_auto_find_reuses_existing() {
        let catalog = catalog();
        let mut storage = MemoryStorage::new();
        storage
            .insert(&Record::new("Organisation", Identity(40)).with_field("name", "Org"))
            .unwrap();

        let mut importer = Importer::new(&catalog, dataset());
        importer.add_auto_find_existing("Organisation", &["name"]).unwrap();
        let outcome = importer.run(&mut storage).unwrap();

        assert_eq!(outcome.remap.require("Organisation", Identity(1)).unwrap(), Identity(40));
        assert!(!outcome.remap.is_new("Organisation", Identity(40)));
        assert_eq!(storage.count("Organisation").unwrap(), 1);

        let meeting_id = outcome.remap.require("Meeting", Identity(3)).unwrap();
        let meeting = storage.get("Meeting", meeting_id).unwrap().unwrap();
        assert_eq!(meeting.get("organisation"), Some(&Value::Ref(Identity(40))));
        assert_eq!(outcome.report.total_reused(), 1);
    }

    #[test]
    fn test_duplicate_lookup_values_in_batch() {
        let catalog = catalog();
        let mut storage = MemoryStorage::new();
        let dataset = dataset()
            .with_record(ImportRecord::new("Organisation", Identity(2)).with_field("name", "Org"));

        let mut importer = Importer::new(&catalog, dataset);
        importer.add_auto_find_existing("Organisation", &["name"]).unwrap();
        let err = importer.run(&mut storage).unwrap_err();

        assert!(matches!(err, Error::AmbiguousLookup { .. }));
    }

    #[test]
    fn test_falsy_values_never_match() {
        let catalog = catalog();
        let mut storage = MemoryStorage::new();
        storage
            .insert(&Record::new("Organisation", Identity(40)).with_field("name", ""))
            .unwrap();
        let dataset = ImportDataset::new()
            .with_record(ImportRecord::new("Organisation", Identity(1)).with_field("name", ""));

        let mut importer = Importer::new(&catalog, dataset);
        importer.add_auto_find_existing("Organisation", &["name"]).unwrap();
        let outcome = importer.run(&mut storage).unwrap();

        assert!(outcome.remap.is_new(
            "Organisation",
            outcome.remap.require("Organisation", Identity(1)).unwrap()
        ));
    }

    #[test]
    fn test_subtype_without_supertype_entry() {
        let catalog = catalog();
        let mut storage = MemoryStorage::new();
        let dataset = dataset().with_record(ImportRecord::new("DiffProposal", Identity(9)));

        let err = Importer::new(&catalog, dataset).run(&mut storage).unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_duplicate_entry() {
        let catalog = catalog();
        let mut storage = MemoryStorage::new();
        let dataset = dataset().with_record(ImportRecord::new("Organisation", Identity(1)));

        let err = Importer::new(&catalog, dataset).run(&mut storage).unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
    }

    #[test]
    fn test_reference_outside_batch_passes_through() {
        let catalog = catalog();
        let mut storage = MemoryStorage::new();
        let dataset = ImportDataset::new()
            .with_record(ImportRecord::new("Proposal", Identity(7)).with_field("meeting", Identity(55)));

        let outcome = Importer::new(&catalog, dataset).run(&mut storage).unwrap();
        let id = outcome.remap.require("Proposal", Identity(7)).unwrap();
        let proposal = storage.get("Proposal", id).unwrap().unwrap();
        assert_eq!(proposal.get("meeting"), Some(&Value::Ref(Identity(55))));
    }

    #[test]
    fn test_auto_find_skips_supertype_views_of_subtypes() {
        let catalog = catalog();
        let mut storage = MemoryStorage::new();
        storage
            .insert(&Record::new("Proposal", Identity(20)).with_field("meeting", Identity(3)))
            .unwrap();
        let dataset = ImportDataset::new()
            .with_record(ImportRecord::new("Proposal", Identity(4)).with_field("meeting", Identity(3)))
            .with_record(ImportRecord::new("DiffProposal", Identity(4)));

        let mut importer = Importer::new(&catalog, dataset);
        importer.add_auto_find_existing("Proposal", &["meeting"]).unwrap();
        let outcome = importer.run(&mut storage).unwrap();

        let new_id = outcome.remap.require("DiffProposal", Identity(4)).unwrap();
        assert_eq!(outcome.remap.require("Proposal", Identity(4)).unwrap(), new_id);
        assert!(outcome.remap.is_new("DiffProposal", new_id));
        assert_eq!(outcome.report.total_reused(), 0);
        assert_eq!(storage.count("DiffProposal").unwrap(), 1);
        assert_eq!(storage.count("Proposal").unwrap(), 2);
    }

    #[test]
    fn test_unknown_auto_find_field() {
        let catalog = catalog();
        let mut importer = Importer::new(&catalog, dataset());

        let err = importer
            .add_auto_find_existing("Organisation", &["slug"])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDirective { .. }));
    }
}
