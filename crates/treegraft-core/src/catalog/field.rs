//! Scalar field definitions.

use serde::{Deserialize, Serialize};

/// A scalar (non-relation) field declared on a type.
///
/// The engine copies scalar values verbatim; the declaration only serves
/// validation of lookup fields and directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Whether the field may not be null.
    #[serde(default)]
    pub required: bool,
}

impl FieldDef {
    /// Create a new required field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    /// Create an optional field.
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}
