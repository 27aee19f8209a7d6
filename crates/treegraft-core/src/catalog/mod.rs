//! Type catalog.
//!
//! The engine never introspects records. Everything it knows about a type
//! (identity field, forward and reverse relations, inheritance parent) comes
//! through the [`TypeCatalog`] trait. [`Catalog`] is the declarative
//! implementation shipped with the crate.

mod catalog;
mod entity;
mod field;
mod relation;

pub use catalog::Catalog;
pub use entity::TypeDef;
pub use field::FieldDef;
pub use relation::{Cardinality, RelationDef};

/// Source of type metadata.
///
/// Implementors provide the four required lookups; chain-aware helpers are
/// derived from them.
pub trait TypeCatalog {
    /// All type names, in declaration order.
    fn type_names(&self) -> Vec<&str>;

    /// Look up a type definition.
    fn get_type(&self, name: &str) -> Option<&TypeDef>;

    /// Forward relations declared on this exact type (not its ancestors).
    fn forward_relations(&self, type_name: &str) -> Vec<&RelationDef>;

    /// Relations declared anywhere whose target is this exact type.
    fn reverse_relations(&self, type_name: &str) -> Vec<&RelationDef>;

    /// Check if a type is declared.
    fn contains(&self, name: &str) -> bool {
        self.get_type(name).is_some()
    }

    /// Identity field of a type.
    fn identity_field(&self, name: &str) -> Option<&str> {
        self.get_type(name).map(|t| t.identity_field.as_str())
    }

    /// Inheritance parent of a type.
    fn parent_type(&self, name: &str) -> Option<&str> {
        self.get_type(name).and_then(|t| t.parent.as_deref())
    }

    /// Types directly extending `name`.
    fn child_types(&self, name: &str) -> Vec<&str> {
        self.type_names()
            .into_iter()
            .filter(|t| self.parent_type(t) == Some(name))
            .collect()
    }

    /// The type followed by its ancestors, nearest first.
    fn chain(&self, name: &str) -> Vec<&str> {
        let mut chain: Vec<&str> = Vec::new();
        let mut current = self.get_type(name);
        while let Some(def) = current {
            if chain.contains(&def.name.as_str()) {
                break;
            }
            chain.push(def.name.as_str());
            current = def.parent.as_deref().and_then(|p| self.get_type(p));
        }
        chain
    }

    /// Forward relations declared along the whole chain.
    fn chain_relations(&self, name: &str) -> Vec<&RelationDef> {
        self.chain(name)
            .into_iter()
            .flat_map(|link| self.forward_relations(link))
            .collect()
    }

    /// Find a forward relation by field name along the chain.
    fn relation(&self, type_name: &str, field: &str) -> Option<&RelationDef> {
        self.chain_relations(type_name)
            .into_iter()
            .find(|r| r.name == field)
    }

    /// Check if a field (scalar, relation or identity) exists along the chain.
    fn has_field(&self, type_name: &str, field: &str) -> bool {
        if self.identity_field(type_name) == Some(field) {
            return true;
        }
        self.chain(type_name).into_iter().any(|link| {
            self.get_type(link)
                .is_some_and(|def| def.get_field(field).is_some())
        }) || self.relation(type_name, field).is_some()
    }

    /// Position of a type in declaration order.
    fn declaration_index(&self, name: &str) -> Option<usize> {
        self.type_names().iter().position(|t| *t == name)
    }
}
