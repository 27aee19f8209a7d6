//! Dependency ordering of record types.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::Directives;
use crate::catalog::TypeCatalog;
use crate::error::Error;

/// Computes the order in which types must be materialized.
///
/// A type depends on:
/// - its inheritance parent;
/// - the target of every required single-valued relation along its chain,
///   together with the target's present subtypes (a subtype record
///   materializes the target's portion);
/// - explicit dependencies registered on the directives.
///
/// Nullable and multi-valued relations never create edges; they are wired
/// in a second pass once every record exists.
pub struct DependencyOrderer<'a> {
    catalog: &'a dyn TypeCatalog,
    directives: &'a Directives,
}

impl<'a> DependencyOrderer<'a> {
    /// Create an orderer.
    pub fn new(catalog: &'a dyn TypeCatalog, directives: &'a Directives) -> Self {
        Self {
            catalog,
            directives,
        }
    }

    /// Order the given types.
    ///
    /// Among the types whose dependencies are satisfied, the earliest
    /// declared one is emitted first.
    pub fn order<I, S>(&self, types: I) -> Result<Vec<String>, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let present: BTreeSet<String> = types
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect();
        for type_name in &present {
            if !self.catalog.contains(type_name) {
                return Err(Error::UnknownType(type_name.clone()));
            }
        }

        let dependencies: BTreeMap<&str, BTreeSet<String>> = present
            .iter()
            .map(|t| (t.as_str(), self.dependencies(t, &present)))
            .collect();

        let mut remaining: BTreeSet<&str> = present.iter().map(String::as_str).collect();
        let mut ordered = Vec::with_capacity(present.len());

        while !remaining.is_empty() {
            let next = remaining
                .iter()
                .copied()
                .filter(|t| {
                    dependencies[t]
                        .iter()
                        .all(|dep| !remaining.contains(dep.as_str()))
                })
                .min_by_key(|t| self.catalog.declaration_index(t));

            let Some(next) = next else {
                let mut types: Vec<String> = remaining.iter().map(|t| t.to_string()).collect();
                types.sort_by_key(|t| self.catalog.declaration_index(t));
                return Err(Error::CyclicDependency { types });
            };

            remaining.remove(next);
            ordered.push(next.to_string());
        }

        debug!(order = ?ordered, "types ordered");
        Ok(ordered)
    }

    /// Present types that must be materialized before `type_name`.
    pub fn dependencies(&self, type_name: &str, present: &BTreeSet<String>) -> BTreeSet<String> {
        let mut deps = BTreeSet::new();

        if let Some(parent) = self.catalog.parent_type(type_name) {
            if present.contains(parent) {
                deps.insert(parent.to_string());
            }
        }

        for rel in self.catalog.chain_relations(type_name) {
            if !rel.orders_creation()
                || self.directives.is_cleared(self.catalog, type_name, &rel.name)
            {
                continue;
            }
            for candidate in present {
                if self.catalog.chain(candidate).contains(&rel.target.as_str()) {
                    deps.insert(candidate.clone());
                }
            }
        }

        for dep in self.directives.explicit_dependencies(type_name) {
            if present.contains(dep) {
                deps.insert(dep.to_string());
            }
        }

        deps
    }
}
