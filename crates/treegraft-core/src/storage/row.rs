//! Stored row format.

use std::collections::BTreeMap;

use rkyv::{Archive, Deserialize, Serialize};

use crate::error::Error;
use crate::record::Record;
use crate::value::{Identity, Value};

/// One link of a record chain as it is stored.
///
/// A subtype record is stored as one row per link, all with the same
/// identity; `parent_type` points at the next link up.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Row {
    /// Type of this link.
    pub type_name: String,
    /// Shared identity.
    pub identity: Identity,
    /// Type of the supertype row, if any.
    pub parent_type: Option<String>,
    /// Fields declared on this link.
    pub fields: BTreeMap<String, Value>,
}

impl Row {
    /// Split a record into one row per chain link.
    pub fn split(record: &Record) -> Vec<Row> {
        record
            .links()
            .map(|link| Row {
                type_name: link.type_name.clone(),
                identity: link.identity,
                parent_type: link.parent.as_ref().map(|p| p.type_name.clone()),
                fields: link.fields.clone(),
            })
            .collect()
    }

    /// Turn this row into a record link with an already assembled parent.
    pub fn into_record(self, parent: Option<Record>) -> Record {
        Record {
            type_name: self.type_name,
            identity: self.identity,
            fields: self.fields,
            parent: parent.map(Box::new),
        }
    }

    /// Serialize the row to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a row from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        // sled values carry no alignment guarantee
        let mut aligned = rkyv::util::AlignedVec::<16>::new();
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}
