//! Core error types.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::value::Identity;

/// Identities grouped by type name, used to report cross-linked records.
pub type IdentityMap = BTreeMap<String, BTreeSet<Identity>>;

/// Core engine errors.
///
/// Every variant aborts the run. Callers are expected to discard all writes
/// made so far (drop the [`Transaction`](crate::storage::Transaction)
/// without committing).
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// The catalog definition is inconsistent.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    /// A type name not declared in the catalog.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A clear directive or explicit dependency that cannot be honoured.
    #[error("invalid directive for {type_name}.{field}: {reason}")]
    InvalidDirective {
        /// Type the directive was registered for.
        type_name: String,
        /// Offending field.
        field: String,
        /// Why the directive was rejected.
        reason: String,
    },

    /// Required relations form a cycle.
    #[error("cyclic dependency between required relations: {}", types.join(", "))]
    CyclicDependency {
        /// Types that could not be ordered.
        types: Vec<String>,
    },

    /// An identity was registered twice in the remap table.
    #[error("{type_name}#{identity} is already registered in the remap table")]
    RemapConflict {
        /// Record type.
        type_name: String,
        /// Original identity.
        identity: Identity,
    },

    /// An identity expected in the remap table was never registered.
    #[error("{type_name}#{identity} has not been materialized")]
    UnresolvedIdentity {
        /// Record type.
        type_name: String,
        /// Original identity.
        identity: Identity,
    },

    /// Structural integrity violation in an input batch.
    #[error("integrity error for {type_name}#{identity}: {reason}")]
    Integrity {
        /// Record type.
        type_name: String,
        /// Record identity.
        identity: Identity,
        /// Description of the violation.
        reason: String,
    },

    /// An auto-find lookup matched more than one record.
    #[error("auto-find on {type_name}.{field} is ambiguous: {reason}")]
    AmbiguousLookup {
        /// Record type.
        type_name: String,
        /// Lookup field.
        field: String,
        /// Description of the ambiguity.
        reason: String,
    },

    /// Cloning would share mutable relation state between the old and new trees.
    #[error("cloned tree is cross-linked with the original: {}", describe(shared))]
    CrossLinkedClone {
        /// Records reachable from both trees, grouped by type.
        shared: IdentityMap,
    },

    /// A hook vetoed the run.
    #[error("hook rejected {type_name}: {message}")]
    HookRejected {
        /// Type the hook was registered for (empty for pre-commit hooks).
        type_name: String,
        /// Reason given by the hook.
        message: String,
    },

    /// Record not found.
    #[error("{type_name}#{identity} not found")]
    NotFound {
        /// Record type.
        type_name: String,
        /// Record identity.
        identity: Identity,
    },
}

impl Error {
    /// Convenience constructor for hook vetoes.
    pub fn hook_rejected(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::HookRejected {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

fn describe(shared: &IdentityMap) -> String {
    shared
        .iter()
        .map(|(type_name, ids)| {
            let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
            format!("{type_name}[{}]", ids.join(","))
        })
        .collect::<Vec<_>>()
        .join(" ")
}
