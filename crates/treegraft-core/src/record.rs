//! In-memory records.

use std::collections::BTreeMap;

use crate::value::{Identity, Value};

/// A record of one type.
///
/// A subtype record owns its supertype portion as `parent`; every link of
/// the chain carries the same identity. Field lookups walk the chain from
/// the most specific link upwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Type of this link.
    pub type_name: String,
    /// Identity shared by every link of the chain.
    pub identity: Identity,
    /// Fields declared on this link.
    pub fields: BTreeMap<String, Value>,
    /// Supertype portion, if the type extends another type.
    pub parent: Option<Box<Record>>,
}

impl Record {
    /// Create an empty record.
    pub fn new(type_name: impl Into<String>, identity: Identity) -> Self {
        Self {
            type_name: type_name.into(),
            identity,
            fields: BTreeMap::new(),
            parent: None,
        }
    }

    /// Set a field on this link.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Attach the supertype portion.
    ///
    /// The parent takes this record's identity.
    pub fn with_parent(mut self, mut parent: Record) -> Self {
        parent.set_identity(self.identity);
        self.parent = Some(Box::new(parent));
        self
    }

    /// Look up a field anywhere along the chain.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.links().find_map(|link| link.fields.get(field))
    }

    /// Mutable lookup along the chain.
    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        if self.fields.contains_key(field) {
            return self.fields.get_mut(field);
        }
        self.parent.as_deref_mut().and_then(|p| p.get_mut(field))
    }

    /// Set a field on whichever link already holds it, or on this link.
    pub fn set(&mut self, field: &str, value: Value) {
        match self.get_mut(field) {
            Some(slot) => *slot = value,
            None => {
                self.fields.insert(field.to_string(), value);
            }
        }
    }

    /// Set the identity on every link.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
        if let Some(parent) = self.parent.as_deref_mut() {
            parent.set_identity(identity);
        }
    }

    /// Iterate over the chain, most specific link first.
    pub fn links(&self) -> impl Iterator<Item = &Record> {
        std::iter::successors(Some(self), |r| r.parent.as_deref())
    }

    /// Type names along the chain, most specific first.
    pub fn chain_types(&self) -> Vec<&str> {
        self.links().map(|l| l.type_name.as_str()).collect()
    }

    /// The view of this record as one of its chain types.
    pub fn view(&self, type_name: &str) -> Option<&Record> {
        self.links().find(|l| l.type_name == type_name)
    }

    /// Mutable view of one chain link.
    pub fn view_mut(&mut self, type_name: &str) -> Option<&mut Record> {
        if self.type_name == type_name {
            return Some(self);
        }
        self.parent.as_deref_mut().and_then(|p| p.view_mut(type_name))
    }

    /// Check whether `type_name` is one of this record's chain types.
    pub fn is_a(&self, type_name: &str) -> bool {
        self.view(type_name).is_some()
    }

    /// Topmost link type.
    pub fn root_type(&self) -> &str {
        self.links()
            .last()
            .map(|l| l.type_name.as_str())
            .unwrap_or(self.type_name.as_str())
    }
}
