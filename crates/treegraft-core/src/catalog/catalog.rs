//! Declarative catalog of types and relations.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::{RelationDef, TypeCatalog, TypeDef};
use crate::error::Error;

/// A catalog declared up front, usually loaded from JSON.
///
/// Types keep their declaration order, which is also the tie-break order
/// used when sorting types for creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Declared types, in declaration order.
    #[serde(default)]
    pub types: Vec<TypeDef>,
    /// Declared forward relations.
    #[serde(default)]
    pub relations: Vec<RelationDef>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type definition.
    pub fn with_type(mut self, def: TypeDef) -> Self {
        self.types.push(def);
        self
    }

    /// Add a relation definition.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Parse and validate a catalog from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let catalog: Catalog =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Serialize the catalog to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Check the catalog for structural consistency.
    pub fn validate(&self) -> Result<(), Error> {
        let mut names = BTreeSet::new();
        for def in &self.types {
            if def.name.is_empty() {
                return Err(Error::InvalidCatalog("type with empty name".into()));
            }
            if def.identity_field.is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "type {} has an empty identity field",
                    def.name
                )));
            }
            if !names.insert(def.name.as_str()) {
                return Err(Error::InvalidCatalog(format!(
                    "type {} declared twice",
                    def.name
                )));
            }
        }

        for def in &self.types {
            if let Some(parent) = &def.parent {
                if !names.contains(parent.as_str()) {
                    return Err(Error::InvalidCatalog(format!(
                        "type {} extends unknown type {}",
                        def.name, parent
                    )));
                }
            }
            self.check_acyclic(def)?;
        }

        for rel in &self.relations {
            for endpoint in [&rel.source, &rel.target] {
                if !names.contains(endpoint.as_str()) {
                    return Err(Error::InvalidCatalog(format!(
                        "relation {}.{} refers to unknown type {}",
                        rel.source, rel.name, endpoint
                    )));
                }
            }
            if rel.is_many() && rel.required {
                return Err(Error::InvalidCatalog(format!(
                    "multi-valued relation {}.{} cannot be required",
                    rel.source, rel.name
                )));
            }
        }

        for def in &self.types {
            self.check_field_names(def)?;
        }

        Ok(())
    }

    fn check_acyclic(&self, def: &TypeDef) -> Result<(), Error> {
        let mut seen = BTreeSet::new();
        let mut current = Some(def);
        while let Some(link) = current {
            if !seen.insert(link.name.as_str()) {
                return Err(Error::InvalidCatalog(format!(
                    "inheritance cycle through {}",
                    def.name
                )));
            }
            current = link.parent.as_deref().and_then(|p| self.get_type(p));
        }
        Ok(())
    }

    /// Field and relation names must be unique along a type's chain.
    fn check_field_names(&self, def: &TypeDef) -> Result<(), Error> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for link in self.chain(&def.name) {
            let Some(link_def) = self.get_type(link) else {
                continue;
            };
            let declared = link_def
                .fields
                .iter()
                .map(|f| f.name.as_str())
                .chain(self.forward_relations(link).into_iter().map(|r| r.name.as_str()));
            for name in declared {
                if name == def.identity_field {
                    return Err(Error::InvalidCatalog(format!(
                        "{link}.{name} shadows the identity field of {}",
                        def.name
                    )));
                }
                if let Some(owner) = seen.insert(name, link) {
                    return Err(Error::InvalidCatalog(format!(
                        "field {name} declared on both {owner} and {link}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl TypeCatalog for Catalog {
    fn type_names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name.as_str()).collect()
    }

    fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    fn forward_relations(&self, type_name: &str) -> Vec<&RelationDef> {
        self.relations
            .iter()
            .filter(|r| r.source == type_name)
            .collect()
    }

    fn reverse_relations(&self, type_name: &str) -> Vec<&RelationDef> {
        self.relations
            .iter()
            .filter(|r| r.target == type_name)
            .collect()
    }
}
