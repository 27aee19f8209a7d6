//! Treegraft Core - subgraph cloning and import with identity remapping.
//!
//! This crate collects the records reachable from a seed, orders their
//! types by required references, and materializes a copy (or an imported
//! dataset) with every reference rewired to the new identities.

pub mod catalog;
pub mod error;
pub mod graph;
pub mod record;
pub mod storage;
pub mod value;

pub use catalog::{Cardinality, Catalog, FieldDef, RelationDef, TypeCatalog, TypeDef};
pub use error::{Error, IdentityMap};
pub use graph::{
    export, safe_clone, CloneOutcome, Cloner, CollectConfig, Collector, DependencyOrderer,
    Directives, HookContext, HookRunner, ImportDataset, ImportOutcome, ImportRecord, Importer,
    RemapTable, Resolution, RunReport, WorkingSet,
};
pub use record::Record;
pub use storage::{MemoryStorage, Row, SledStorage, Storage, StorageConfig, Transaction};
pub use value::{Identity, Value};

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
