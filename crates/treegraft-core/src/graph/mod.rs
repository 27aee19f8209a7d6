//! Subgraph engine: collection, ordering, remapping, cloning and import.
//!
//! A run goes through the same stages whether it clones in place or imports
//! a foreign dataset:
//!
//! 1. a [`WorkingSet`] is built, either by the [`Collector`] walking storage
//!    from seed records or by the [`Importer`] assembling a dataset;
//! 2. the [`DependencyOrderer`] sorts the record types so required
//!    references always point at records that already exist;
//! 3. records are written type by type, every new identity is registered in
//!    the [`RemapTable`], and references are rewired in a second pass.
//!
//! [`safe_clone`] wraps collection and cloning in a transaction and rejects
//! clones that end up sharing state with the original tree.

mod cloner;
mod collector;
mod dataset;
mod directives;
mod export;
mod guard;
mod hooks;
mod importer;
mod materialize;
mod orderer;
mod remap;
mod reverse_index;
mod working_set;

pub use cloner::{CloneOutcome, Cloner};
pub use collector::{CollectConfig, Collector};
pub use dataset::{ImportDataset, ImportRecord};
pub use directives::Directives;
pub use export::export;
pub use guard::safe_clone;
pub use hooks::{HookContext, HookRunner, PostSaveHook, PreCommitHook, PreSaveHook};
pub use importer::{ImportOutcome, Importer};
pub use materialize::RunReport;
pub use orderer::DependencyOrderer;
pub use remap::{RemapTable, Resolution};
pub use working_set::WorkingSet;
