//! Collection of the working set reachable from seed records.

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, instrument, warn};

use super::reverse_index::ReverseIndex;
use super::WorkingSet;
use crate::catalog::TypeCatalog;
use crate::error::Error;
use crate::record::Record;
use crate::storage::Storage;
use crate::value::Identity;

/// Traversal settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectConfig {
    /// Types never added to the working set nor traversed.
    pub exclude: BTreeSet<String>,
    /// Maximum relation distance from the seeds. None means unlimited.
    pub max_depth: Option<usize>,
}

impl CollectConfig {
    /// Create an unbounded configuration with no exclusions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude a type from traversal.
    pub fn exclude(mut self, type_name: impl Into<String>) -> Self {
        self.exclude.insert(type_name.into());
        self
    }

    /// Exclude several types from traversal.
    pub fn with_excludes<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(types.into_iter().map(Into::into));
        self
    }

    /// Bound the traversal depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Check if a type is excluded.
    pub fn is_excluded(&self, type_name: &str) -> bool {
        self.exclude.contains(type_name)
    }
}

/// Breadth-first walker building a [`WorkingSet`].
///
/// Every declared relation of a visited record's chain is followed: forward
/// single and multi-valued fields, reverse relations pointing at the record,
/// and inheritance both up (supertype views) and down (subtype records with
/// the same identity). Inheritance steps do not count towards the depth.
pub struct Collector<'a> {
    catalog: &'a dyn TypeCatalog,
    storage: &'a dyn Storage,
    config: CollectConfig,
}

impl<'a> Collector<'a> {
    /// Create a collector with the default configuration.
    pub fn new(catalog: &'a dyn TypeCatalog, storage: &'a dyn Storage) -> Self {
        Self {
            catalog,
            storage,
            config: CollectConfig::default(),
        }
    }

    /// Use the given configuration.
    pub fn with_config(mut self, config: CollectConfig) -> Self {
        self.config = config;
        self
    }

    /// Load a seed from storage and collect from it.
    pub fn collect_from(&self, type_name: &str, identity: Identity) -> Result<WorkingSet, Error> {
        if !self.catalog.contains(type_name) {
            return Err(Error::UnknownType(type_name.to_string()));
        }
        let seed = self
            .storage
            .get(type_name, identity)?
            .ok_or_else(|| Error::NotFound {
                type_name: type_name.to_string(),
                identity,
            })?;
        self.collect(&[seed])
    }

    /// Collect everything reachable from `seeds`.
    ///
    /// Seeds are always part of the result, even when their type is
    /// excluded; exclusion only prunes traversal.
    #[instrument(skip(self, seeds), fields(seeds = seeds.len()))]
    pub fn collect(&self, seeds: &[Record]) -> Result<WorkingSet, Error> {
        if let Some(depth) = self.config.max_depth {
            warn!(
                max_depth = depth,
                "depth-limited collection may leave dangling in-set references"
            );
        }

        let mut set = WorkingSet::new();
        let mut reverse = ReverseIndex::new();
        let mut queue: VecDeque<(Record, usize)> = VecDeque::new();
        for seed in seeds {
            if !self.catalog.contains(&seed.type_name) {
                return Err(Error::UnknownType(seed.type_name.clone()));
            }
            queue.push_back((seed.clone(), 0));
        }

        while let Some((record, depth)) = queue.pop_front() {
            if set.contains(&record.type_name, record.identity) {
                continue;
            }

            // same depth, ahead of everything queued at depth + 1
            for view in self.inheritance_neighbors(&record)? {
                if !set.contains(&view.type_name, view.identity) {
                    queue.push_front((view, depth));
                }
            }

            let within_depth = self.config.max_depth.map_or(true, |max| depth < max);
            if within_depth {
                for neighbor in self.relation_neighbors(&record, &mut reverse)? {
                    if !set.contains(&neighbor.type_name, neighbor.identity) {
                        queue.push_back((neighbor, depth + 1));
                    }
                }
            }

            set.insert(record);
        }

        debug!(records = set.len(), types = set.types().len(), "collection finished");
        Ok(set)
    }

    /// Supertype view and subtype records sharing the record's identity.
    fn inheritance_neighbors(&self, record: &Record) -> Result<Vec<Record>, Error> {
        let mut views = Vec::new();

        if let Some(parent) = record.parent.as_deref() {
            if !self.config.is_excluded(&parent.type_name) {
                views.push(parent.clone());
            }
        }

        for child in self.catalog.child_types(&record.type_name) {
            if self.config.is_excluded(child) {
                continue;
            }
            if let Some(sub) = self.storage.get(child, record.identity)? {
                views.push(sub);
            }
        }

        Ok(views)
    }

    /// Records reached through forward and reverse relations.
    fn relation_neighbors(
        &self,
        record: &Record,
        reverse: &mut ReverseIndex,
    ) -> Result<Vec<Record>, Error> {
        let mut neighbors = Vec::new();

        for rel in self.catalog.forward_relations(&record.type_name) {
            if self.config.is_excluded(&rel.target) {
                continue;
            }
            let Some(value) = record.get(&rel.name) else {
                continue;
            };
            for target in value.referenced() {
                match self.storage.get(&rel.target, target)? {
                    Some(found) => neighbors.push(found),
                    None => debug!(
                        source = %record.type_name,
                        field = %rel.name,
                        target = %target,
                        "dangling reference kept as external"
                    ),
                }
            }
        }

        for rel in self.catalog.reverse_relations(&record.type_name) {
            if self.config.is_excluded(&rel.source) {
                continue;
            }
            neighbors.extend_from_slice(reverse.holders(
                self.storage,
                &rel.source,
                &rel.name,
                record.identity,
            )?);
        }

        Ok(neighbors)
    }
}
