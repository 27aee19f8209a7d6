//! Cloning a working set inside the same store.

use tracing::{info, instrument};

use super::materialize::{Materializer, RunReport};
use super::{Directives, HookContext, HookRunner, RemapTable, WorkingSet};
use crate::catalog::TypeCatalog;
use crate::error::Error;
use crate::record::Record;
use crate::storage::Storage;

/// Result of a clone.
#[derive(Debug)]
pub struct CloneOutcome {
    /// The new records, with their supertype views.
    pub working_set: WorkingSet,
    /// Mapping from original to new identities.
    pub remap: RemapTable,
    /// Run summary.
    pub report: RunReport,
}

/// Materializes a fresh copy of every record of a working set.
///
/// References to records inside the set are rewired to the copies;
/// references leaving the set are kept verbatim. Records outside the set are
/// never written, so an out-of-set record linking to an original does not
/// gain a link to its copy.
///
/// The cloner writes as it goes. Run it inside a
/// [`Transaction`](crate::storage::Transaction) and drop the transaction on
/// error.
pub struct Cloner<'a> {
    catalog: &'a dyn TypeCatalog,
    directives: Directives,
    hooks: HookRunner,
}

impl<'a> Cloner<'a> {
    /// Create a cloner with no directives or hooks.
    pub fn new(catalog: &'a dyn TypeCatalog) -> Self {
        Self {
            catalog,
            directives: Directives::new(),
            hooks: HookRunner::new(),
        }
    }

    /// Catalog the cloner works against.
    pub fn catalog(&self) -> &'a dyn TypeCatalog {
        self.catalog
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

    /// Directives registered so far.
    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    /// Clone every record of `working_set` into `storage`.
    #[instrument(skip_all, fields(records = working_set.len()))]
    pub fn clone(
        &mut self,
        storage: &mut dyn Storage,
        working_set: &WorkingSet,
    ) -> Result<CloneOutcome, Error> {
        let mut remap = RemapTable::new();
        let mut materializer = Materializer {
            catalog: self.catalog,
            directives: &self.directives,
            hooks: &mut self.hooks,
        };
        let (new_set, report) = materializer.run(storage, working_set, &mut remap)?;

        info!(
            created = report.total_created(),
            types = report.created.len(),
            patched = report.deferred_patched,
            "clone finished"
        );

        Ok(CloneOutcome {
            working_set: new_set,
            remap,
            report,
        })
    }
}
