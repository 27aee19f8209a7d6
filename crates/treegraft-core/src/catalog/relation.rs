//! Relation definitions between types.

use serde::{Deserialize, Serialize};

/// Cardinality of a forward relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Single-valued reference (`Value::Ref` or `Value::Null`).
    One,
    /// Multi-valued reference (`Value::RefList`).
    Many,
}

/// A forward relation declared on a source type.
///
/// The reverse side is never declared: it is derived by looking up every
/// relation whose `target` is a given type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Field on the source type holding the reference(s).
    pub name: String,
    /// Type declaring the field.
    pub source: String,
    /// Referenced type.
    pub target: String,
    /// Relation cardinality.
    pub cardinality: Cardinality,
    /// Whether a single-valued relation may not be null.
    #[serde(default)]
    pub required: bool,
}

impl RelationDef {
    /// Create a nullable single-valued relation.
    pub fn one(
        source: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            cardinality: Cardinality::One,
            required: false,
        }
    }

    /// Create a multi-valued relation.
    pub fn many(
        source: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            cardinality: Cardinality::Many,
            required: false,
        }
    }

    /// Mark the relation as non-nullable.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Check if this is a single-valued relation.
    pub fn is_one(&self) -> bool {
        self.cardinality == Cardinality::One
    }

    /// Check if this is a multi-valued relation.
    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }

    /// Required single-valued relations constrain creation order.
    pub fn orders_creation(&self) -> bool {
        self.is_one() && self.required
    }
}
