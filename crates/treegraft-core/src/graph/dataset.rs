//! Serialized import format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::value::{Identity, Value};

/// One chain link of one record, as exchanged between stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Type of this link.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Identity in the exporting store.
    pub identity: Identity,
    /// Fields declared on this link.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl ImportRecord {
    /// Create an entry with no fields.
    pub fn new(type_name: impl Into<String>, identity: Identity) -> Self {
        Self {
            type_name: type_name.into(),
            identity,
            fields: BTreeMap::new(),
        }
    }

    /// Set a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// An unordered batch of entries; a JSON array on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportDataset {
    /// Entries in no particular order.
    pub records: Vec<ImportRecord>,
}

impl ImportDataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a dataset from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Serialize the dataset to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Append an entry.
    pub fn push(&mut self, record: ImportRecord) {
        self.records.push(record);
    }

    /// Add an entry.
    pub fn with_record(mut self, record: ImportRecord) -> Self {
        self.records.push(record);
        self
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_wire_format() {
        let json = r#"[
            {"type": "Meeting", "identity": 1, "fields": {"name": "Board", "organisation": {"ref": 4}}},
            {"type": "Tag", "identity": 2}
        ]"#;

        let dataset = ImportDataset::from_json(json).unwrap();
        assert_eq!(
            dataset,
            ImportDataset::new()
                .with_record(
                    ImportRecord::new("Meeting", Identity(1))
                        .with_field("name", "Board")
                        .with_field("organisation", Identity(4))
                )
                .with_record(ImportRecord::new("Tag", Identity(2)))
        );
    }

    #[test]
    fn test_malformed_json() {
        let err = ImportDataset::from_json(r#"{"type": "Tag"}"#).unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }
}
