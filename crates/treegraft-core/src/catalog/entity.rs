//! Type definitions.

use super::field::FieldDef;
use serde::{Deserialize, Serialize};

/// A record type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Type name (unique within the catalog).
    pub name: String,
    /// Name of the identity field.
    #[serde(default = "default_identity_field")]
    pub identity_field: String,
    /// Supertype sharing this type's identity, if any.
    #[serde(default)]
    pub parent: Option<String>,
    /// Scalar fields declared on this link of the chain.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

fn default_identity_field() -> String {
    "id".to_string()
}

impl TypeDef {
    /// Create a new type definition with an `id` identity field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_field: default_identity_field(),
            parent: None,
            fields: Vec::new(),
        }
    }

    /// Set the identity field name.
    pub fn with_identity_field(mut self, name: impl Into<String>) -> Self {
        self.identity_field = name.into();
        self
    }

    /// Declare the inheritance parent.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Add a scalar field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple scalar fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Get a scalar field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_builder() {
        let def = TypeDef::new("DiffProposal")
            .extends("Proposal")
            .with_field(FieldDef::new("name"))
            .with_field(FieldDef::optional("note"));

        assert_eq!(def.identity_field, "id");
        assert_eq!(def.parent.as_deref(), Some("Proposal"));
        assert!(def.get_field("note").is_some());
        assert!(def.get_field("missing").is_none());
    }
}
