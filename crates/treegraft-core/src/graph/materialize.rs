//! Create path shared by the cloner and the importer.
//!
//! Records are written type by type in dependency order. Single-valued
//! references to records that do not exist yet are nulled and patched in a
//! second pass; multi-valued references are always rewritten in the second
//! pass, once every counterpart exists.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{DependencyOrderer, Directives, HookContext, HookRunner, RemapTable, Resolution, WorkingSet};
use crate::catalog::{Cardinality, TypeCatalog};
use crate::error::Error;
use crate::record::Record;
use crate::storage::Storage;
use crate::value::{Identity, Value};

/// Summary of a clone or import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Records created, per type (supertype portions are not counted apart).
    pub created: BTreeMap<String, usize>,
    /// Records reused through auto-find, per type.
    pub reused: BTreeMap<String, usize>,
    /// Single-valued references patched in the second pass.
    pub deferred_patched: usize,
    /// Multi-valued fields rewritten in the second pass.
    pub many_rewritten: usize,
    /// Materialized originals that no other record in the set referenced.
    pub unreferenced: Vec<(String, Identity)>,
}

impl RunReport {
    /// Total number of records created.
    pub fn total_created(&self) -> usize {
        self.created.values().sum()
    }

    /// Total number of records reused.
    pub fn total_reused(&self) -> usize {
        self.reused.values().sum()
    }
}

/// A record written in the first pass, awaiting the second.
struct Pending {
    type_name: String,
    original: Record,
    new_identity: Identity,
    deferred: Vec<String>,
}

pub(crate) struct Materializer<'a> {
    pub catalog: &'a dyn TypeCatalog,
    pub directives: &'a Directives,
    pub hooks: &'a mut HookRunner,
}

impl Materializer<'_> {
    /// Materialize every record of `source` not already registered in `remap`.
    ///
    /// Returns the new records (with their supertype views) and a report.
    pub fn run(
        &mut self,
        storage: &mut dyn Storage,
        source: &WorkingSet,
        remap: &mut RemapTable,
    ) -> Result<(WorkingSet, RunReport), Error> {
        let catalog = self.catalog;
        let mut report = RunReport::default();
        let mut referenced: BTreeSet<(String, Identity)> = BTreeSet::new();

        let independent = source.independent();
        let to_create: Vec<&str> = independent
            .types()
            .into_iter()
            .filter(|t| {
                independent
                    .records_of(t)
                    .any(|r| !remap.contains(t, r.identity))
            })
            .collect();
        let order = DependencyOrderer::new(catalog, self.directives).order(to_create)?;

        let mut pending = Vec::new();
        for type_name in &order {
            let originals: Vec<&Record> = independent
                .records_of(type_name)
                .filter(|r| !remap.contains(type_name, r.identity))
                .collect();

            let mut drafts = Vec::with_capacity(originals.len());
            let mut deferred = Vec::with_capacity(originals.len());
            for original in &originals {
                let (draft, fields) = self.draft(original, source, remap, &mut referenced)?;
                drafts.push(draft);
                deferred.push(fields);
            }

            let mut ctx = HookContext {
                remap: &*remap,
                storage: &mut *storage,
            };
            self.hooks.run_pre_save(type_name, &mut ctx, &mut drafts)?;

            let mut created = Vec::with_capacity(drafts.len());
            for ((original, draft), fields) in originals.iter().zip(drafts).zip(deferred) {
                let new = storage.create(draft)?;
                remap.register(original, &new)?;
                debug!(
                    type_name = %type_name,
                    original = %original.identity,
                    new = %new.identity,
                    "record materialized"
                );
                pending.push(Pending {
                    type_name: type_name.clone(),
                    original: (*original).clone(),
                    new_identity: new.identity,
                    deferred: fields,
                });
                created.push(new);
            }
            *report.created.entry(type_name.clone()).or_default() += created.len();

            let mut ctx = HookContext {
                remap: &*remap,
                storage: &mut *storage,
            };
            self.hooks.run_post_save(type_name, &mut ctx, &created)?;
        }

        for item in &pending {
            self.second_pass(storage, source, remap, item, &mut report, &mut referenced)?;
        }

        let mut ctx = HookContext {
            remap: &*remap,
            storage: &mut *storage,
        };
        self.hooks.run_pre_commit(&mut ctx)?;

        for item in &pending {
            let identity = item.original.identity;
            let was_referenced = item
                .original
                .links()
                .any(|link| referenced.contains(&(link.type_name.clone(), identity)));
            if !was_referenced {
                debug!(type_name = %item.type_name, original = %identity, "record not referenced within the set");
                report.unreferenced.push((item.type_name.clone(), identity));
            }
        }

        let mut result = WorkingSet::new();
        for item in &pending {
            let record = storage
                .get(&item.type_name, item.new_identity)?
                .ok_or_else(|| Error::NotFound {
                    type_name: item.type_name.clone(),
                    identity: item.new_identity,
                })?;
            for link in record.links() {
                result.replace(link.clone());
            }
        }

        Ok((result, report))
    }

    /// Copy a record, rewriting what can be rewritten before anything of its
    /// type is written. Returns the draft and the deferred fields.
    fn draft(
        &self,
        original: &Record,
        source: &WorkingSet,
        remap: &RemapTable,
        referenced: &mut BTreeSet<(String, Identity)>,
    ) -> Result<(Record, Vec<String>), Error> {
        let catalog = self.catalog;
        let mut draft = original.clone();
        let mut deferred = Vec::new();

        for rel in catalog.chain_relations(&original.type_name) {
            let Some(value) = original.get(&rel.name) else {
                continue;
            };

            if self.directives.is_cleared(catalog, &original.type_name, &rel.name) {
                let cleared = match rel.cardinality {
                    Cardinality::One => Value::Null,
                    Cardinality::Many => Value::RefList(Vec::new()),
                };
                draft.set(&rel.name, cleared);
                continue;
            }

            match (rel.cardinality, value) {
                (Cardinality::One, Value::Ref(old)) => {
                    if !source.contains(&rel.target, *old) {
                        continue;
                    }
                    referenced.insert((rel.target.clone(), *old));
                    match remap.resolve(&rel.target, *old) {
                        Resolution::Remapped(new) => draft.set(&rel.name, Value::Ref(new)),
                        Resolution::External if rel.required => {
                            return Err(Error::UnresolvedIdentity {
                                type_name: rel.target.clone(),
                                identity: *old,
                            })
                        }
                        Resolution::External => {
                            draft.set(&rel.name, Value::Null);
                            deferred.push(rel.name.clone());
                        }
                    }
                }
                (Cardinality::Many, Value::RefList(ids)) => {
                    let external: Vec<Identity> = ids
                        .iter()
                        .copied()
                        .filter(|id| !source.contains(&rel.target, *id))
                        .collect();
                    draft.set(&rel.name, Value::RefList(external));
                }
                (_, Value::Null) => {}
                (cardinality, value) => {
                    return Err(Error::Integrity {
                        type_name: original.type_name.clone(),
                        identity: original.identity,
                        reason: format!(
                            "relation {} is {cardinality:?} but holds {value}",
                            rel.name
                        ),
                    })
                }
            }
        }

        Ok((draft, deferred))
    }

    /// Patch deferred single-valued fields and rewrite multi-valued ones.
    fn second_pass(
        &self,
        storage: &mut dyn Storage,
        source: &WorkingSet,
        remap: &RemapTable,
        item: &Pending,
        report: &mut RunReport,
        referenced: &mut BTreeSet<(String, Identity)>,
    ) -> Result<(), Error> {
        let catalog = self.catalog;
        let mut record = storage
            .get(&item.type_name, item.new_identity)?
            .ok_or_else(|| Error::NotFound {
                type_name: item.type_name.clone(),
                identity: item.new_identity,
            })?;
        let mut changed = false;

        for field in &item.deferred {
            let (Some(rel), Some(Value::Ref(old))) =
                (catalog.relation(&item.type_name, field), item.original.get(field))
            else {
                continue;
            };
            let new = remap.require(&rel.target, *old)?;
            record.set(field, Value::Ref(new));
            report.deferred_patched += 1;
            changed = true;
        }

        for rel in catalog.chain_relations(&item.type_name) {
            if !rel.is_many() || self.directives.is_cleared(catalog, &item.type_name, &rel.name) {
                continue;
            }
            let Some(Value::RefList(ids)) = item.original.get(&rel.name) else {
                continue;
            };
            if !ids.iter().any(|id| source.contains(&rel.target, *id)) {
                continue;
            }

            let mut rewritten = Vec::with_capacity(ids.len());
            for id in ids {
                if source.contains(&rel.target, *id) {
                    referenced.insert((rel.target.clone(), *id));
                    rewritten.push(remap.require(&rel.target, *id)?);
                } else {
                    rewritten.push(*id);
                }
            }
            record.set(&rel.name, Value::RefList(rewritten));
            report.many_rewritten += 1;
            changed = true;
        }

        if changed {
            storage.update(&record)?;
        }
        Ok(())
    }
}
