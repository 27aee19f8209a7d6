//! Caller-supplied callbacks around materialization.
//!
//! Hooks are the cancellation contract of a run: any error a hook returns
//! aborts the run and propagates unchanged, so the enclosing transaction is
//! dropped without committing. [`Error::HookRejected`] is the conventional
//! veto.

use std::collections::BTreeMap;

use crate::catalog::TypeCatalog;
use crate::error::Error;
use crate::record::Record;
use crate::storage::Storage;

use super::RemapTable;

/// What a hook can see and touch.
pub struct HookContext<'s> {
    /// Mapping built so far.
    pub remap: &'s RemapTable,
    /// Storage the run writes to.
    pub storage: &'s mut dyn Storage,
}

/// Hook receiving the drafts of one type before they are written.
pub type PreSaveHook = Box<dyn FnMut(&mut HookContext<'_>, &mut [Record]) -> Result<(), Error>>;

/// Hook receiving the records of one type after they were written.
pub type PostSaveHook = Box<dyn FnMut(&mut HookContext<'_>, &[Record]) -> Result<(), Error>>;

/// Hook run once, after every record has been written and rewired.
pub type PreCommitHook = Box<dyn FnMut(&mut HookContext<'_>) -> Result<(), Error>>;

/// Registered hooks, run in registration order.
#[derive(Default)]
pub struct HookRunner {
    pre_save: BTreeMap<String, Vec<PreSaveHook>>,
    post_save: BTreeMap<String, Vec<PostSaveHook>>,
    pre_commit: Vec<PreCommitHook>,
}

impl HookRunner {
    /// Create a runner with no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-save hook for `type_name`.
    pub fn add_pre_save<F>(
        &mut self,
        catalog: &dyn TypeCatalog,
        type_name: &str,
        hook: F,
    ) -> Result<(), Error>
    where
        F: FnMut(&mut HookContext<'_>, &mut [Record]) -> Result<(), Error> + 'static,
    {
        known(catalog, type_name)?;
        self.pre_save
            .entry(type_name.to_string())
            .or_default()
            .push(Box::new(hook));
        Ok(())
    }

    /// Register a post-save hook for `type_name`.
    ///
    /// Records handed to post-save hooks are already written; a hook that
    /// wants to change them must write through `ctx.storage` itself.
    pub fn add_post_save<F>(
        &mut self,
        catalog: &dyn TypeCatalog,
        type_name: &str,
        hook: F,
    ) -> Result<(), Error>
    where
        F: FnMut(&mut HookContext<'_>, &[Record]) -> Result<(), Error> + 'static,
    {
        known(catalog, type_name)?;
        self.post_save
            .entry(type_name.to_string())
            .or_default()
            .push(Box::new(hook));
        Ok(())
    }

    /// Register a pre-commit hook.
    pub fn add_pre_commit<F>(&mut self, hook: F)
    where
        F: FnMut(&mut HookContext<'_>) -> Result<(), Error> + 'static,
    {
        self.pre_commit.push(Box::new(hook));
    }

    /// Run the pre-save hooks of one type.
    pub fn run_pre_save(
        &mut self,
        type_name: &str,
        ctx: &mut HookContext<'_>,
        drafts: &mut [Record],
    ) -> Result<(), Error> {
        if let Some(hooks) = self.pre_save.get_mut(type_name) {
            for hook in hooks {
                hook(&mut *ctx, &mut *drafts)?;
            }
        }
        Ok(())
    }

    /// Run the post-save hooks of one type.
    pub fn run_post_save(
        &mut self,
        type_name: &str,
        ctx: &mut HookContext<'_>,
        records: &[Record],
    ) -> Result<(), Error> {
        if let Some(hooks) = self.post_save.get_mut(type_name) {
            for hook in hooks {
                hook(&mut *ctx, records)?;
            }
        }
        Ok(())
    }

    /// Run every pre-commit hook.
    pub fn run_pre_commit(&mut self, ctx: &mut HookContext<'_>) -> Result<(), Error> {
        for hook in &mut self.pre_commit {
            hook(&mut *ctx)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for HookRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRunner")
            .field("pre_save", &self.pre_save.keys().collect::<Vec<_>>())
            .field("post_save", &self.post_save.keys().collect::<Vec<_>>())
            .field("pre_commit", &self.pre_commit.len())
            .finish()
    }
}

fn known(catalog: &dyn TypeCatalog, type_name: &str) -> Result<(), Error> {
    if catalog.contains(type_name) {
        Ok(())
    } else {
        Err(Error::UnknownType(type_name.to_string()))
    }
}
