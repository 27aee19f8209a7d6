//! Relation rewrite directives and explicit ordering edges.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::TypeCatalog;
use crate::error::Error;

/// Caller-supplied overrides applied while materializing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// Relation fields to clear instead of remap, per type.
    clears: BTreeMap<String, BTreeSet<String>>,
    /// Types that must be created after other types, per type.
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl Directives {
    /// Create an empty directive set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the given relation fields on every record of `type_name`
    /// (subtypes included) instead of remapping them.
    ///
    /// Only relations can be cleared, and never a required single-valued one.
    pub fn add_clear(
        &mut self,
        catalog: &dyn TypeCatalog,
        type_name: &str,
        fields: &[&str],
    ) -> Result<(), Error> {
        if !catalog.contains(type_name) {
            return Err(Error::UnknownType(type_name.to_string()));
        }
        for field in fields {
            let Some(rel) = catalog.relation(type_name, field) else {
                return Err(Error::InvalidDirective {
                    type_name: type_name.to_string(),
                    field: field.to_string(),
                    reason: "only relation fields can be cleared".into(),
                });
            };
            if rel.orders_creation() {
                return Err(Error::InvalidDirective {
                    type_name: type_name.to_string(),
                    field: field.to_string(),
                    reason: "a required relation cannot be cleared".into(),
                });
            }
        }
        self.clears
            .entry(type_name.to_string())
            .or_default()
            .extend(fields.iter().map(|f| f.to_string()));
        Ok(())
    }

    /// Require `type_name` to be created after every type in `depends_on`.
    pub fn add_explicit_dependency(
        &mut self,
        catalog: &dyn TypeCatalog,
        type_name: &str,
        depends_on: &[&str],
    ) -> Result<(), Error> {
        for name in std::iter::once(&type_name).chain(depends_on) {
            if !catalog.contains(name) {
                return Err(Error::UnknownType(name.to_string()));
            }
        }
        self.dependencies
            .entry(type_name.to_string())
            .or_default()
            .extend(depends_on.iter().map(|d| d.to_string()));
        Ok(())
    }

    /// Check whether `field` is cleared for records of `type_name`.
    pub fn is_cleared(&self, catalog: &dyn TypeCatalog, type_name: &str, field: &str) -> bool {
        catalog.chain(type_name).into_iter().any(|link| {
            self.clears
                .get(link)
                .is_some_and(|fields| fields.contains(field))
        })
    }

    /// Explicit dependencies declared for a type.
    pub fn explicit_dependencies(&self, type_name: &str) -> impl Iterator<Item = &str> {
        self.dependencies
            .get(type_name)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, FieldDef, RelationDef, TypeDef};

    fn catalog() -> Catalog {
        Catalog::new()
            .with_type(TypeDef::new("Meeting"))
            .with_type(TypeDef::new("User"))
            .with_type(TypeDef::new("Proposal").with_field(FieldDef::new("title")))
            .with_type(TypeDef::new("DiffProposal").extends("Proposal"))
            .with_relation(RelationDef::one("Proposal", "meeting", "Meeting").required())
            .with_relation(RelationDef::one("Proposal", "author", "User"))
    }

    #[test]
    fn test_clear_applies_to_subtypes() {
        let catalog = catalog();
        let mut directives = Directives::new();
        directives.add_clear(&catalog, "Proposal", &["author"]).unwrap();

        assert!(directives.is_cleared(&catalog, "Proposal", "author"));
        assert!(directives.is_cleared(&catalog, "DiffProposal", "author"));
        assert!(!directives.is_cleared(&catalog, "Proposal", "meeting"));
    }

    #[test]
    fn test_clear_rejects_scalars_and_required() {
        let catalog = catalog();
        let mut directives = Directives::new();

        let scalar = directives.add_clear(&catalog, "Proposal", &["title"]);
        assert!(matches!(scalar, Err(Error::InvalidDirective { .. })));

        let required = directives.add_clear(&catalog, "DiffProposal", &["meeting"]);
        assert!(matches!(required, Err(Error::InvalidDirective { .. })));

        let unknown = directives.add_clear(&catalog, "Nope", &["meeting"]);
        assert!(matches!(unknown, Err(Error::UnknownType(_))));
    }

    #[test]
    fn test_explicit_dependency() {
        let catalog = catalog();
        let mut directives = Directives::new();
        directives
            .add_explicit_dependency(&catalog, "Meeting", &["User"])
            .unwrap();

        assert_eq!(
            directives.explicit_dependencies("Meeting").collect::<Vec<_>>(),
            vec!["User"]
        );
        assert!(directives
            .add_explicit_dependency(&catalog, "Meeting", &["Ghost"])
            .is_err());
    }
}
