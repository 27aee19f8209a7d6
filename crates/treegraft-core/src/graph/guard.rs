//! Cloning with a cross-link check.

use std::collections::BTreeSet;

use tracing::{info, instrument, warn};

use super::reverse_index::ReverseIndex;
use super::{CloneOutcome, Cloner, CollectConfig, Collector, WorkingSet};
use crate::catalog::TypeCatalog;
use crate::error::{Error, IdentityMap};
use crate::storage::{Storage, Transaction};
use crate::value::Identity;

/// Collect from a seed, clone, and verify the clone left the original tree
/// untouched, all inside one transaction.
///
/// After cloning, the tree is collected again from the same seed. Any record
/// that was not in the first collection means the clone is reachable from
/// the original. Records linked through multi-valued relations from both
/// trees are reported as well, since a change through one tree would show in
/// the other. Either case is [`Error::CrossLinkedClone`] and nothing is
/// committed to `storage`.
#[instrument(skip(storage, config, cloner))]
pub fn safe_clone(
    storage: &mut dyn Storage,
    seed_type: &str,
    seed: Identity,
    config: &CollectConfig,
    cloner: &mut Cloner<'_>,
) -> Result<CloneOutcome, Error> {
    let catalog = cloner.catalog();
    let mut tx = Transaction::begin(storage);

    let original = Collector::new(catalog, &tx)
        .with_config(config.clone())
        .collect_from(seed_type, seed)?;
    let outcome = cloner.clone(&mut tx, &original)?;

    let recollected = Collector::new(catalog, &tx)
        .with_config(config.clone())
        .collect_from(seed_type, seed)?;
    let extra = difference(&recollected.identities(), &original.identities());
    if !extra.is_empty() {
        warn!(types = extra.len(), "clone reachable from the original tree");
        return Err(Error::CrossLinkedClone { shared: extra });
    }

    let mut reverse = ReverseIndex::new();
    let old_links = many_linked(catalog, &tx, &mut reverse, &original)?;
    let new_links = many_linked(catalog, &tx, &mut reverse, &outcome.working_set)?;
    let mut shared = IdentityMap::new();
    for (type_name, identity) in old_links.intersection(&new_links) {
        shared
            .entry(type_name.clone())
            .or_default()
            .insert(*identity);
    }
    if !shared.is_empty() {
        warn!(types = shared.len(), "trees share multi-valued links");
        return Err(Error::CrossLinkedClone { shared });
    }

    let rows = tx.commit()?;
    info!(rows, "safe clone committed");
    Ok(outcome)
}

fn difference(left: &IdentityMap, right: &IdentityMap) -> IdentityMap {
    let mut out = IdentityMap::new();
    for (type_name, ids) in left {
        let extra: BTreeSet<Identity> = match right.get(type_name) {
            Some(known) => ids.difference(known).copied().collect(),
            None => ids.clone(),
        };
        if !extra.is_empty() {
            out.insert(type_name.clone(), extra);
        }
    }
    out
}

/// Records a tree is linked with through multi-valued relations: targets of
/// its own multi-valued fields, and out-of-set records holding one of its
/// records in a multi-valued field.
fn many_linked(
    catalog: &dyn TypeCatalog,
    storage: &dyn Storage,
    reverse: &mut ReverseIndex,
    set: &WorkingSet,
) -> Result<BTreeSet<(String, Identity)>, Error> {
    let mut linked = BTreeSet::new();

    for record in set.iter() {
        for rel in catalog.forward_relations(&record.type_name) {
            if !rel.is_many() {
                continue;
            }
            if let Some(value) = record.get(&rel.name) {
                linked.extend(value.referenced().into_iter().map(|id| (rel.target.clone(), id)));
            }
        }

        for rel in catalog.reverse_relations(&record.type_name) {
            if !rel.is_many() {
                continue;
            }
            for holder in reverse.holders(storage, &rel.source, &rel.name, record.identity)? {
                if !set.contains(&holder.type_name, holder.identity) {
                    linked.insert((holder.type_name.clone(), holder.identity));
                }
            }
        }
    }

    Ok(linked)
}
