//! Storage collaborator.
//!
//! Backends implement four row-level primitives; chain-aware record
//! operations (create, get, find, ...) are provided on top of them so every
//! backend assembles inheritance chains the same way.

mod config;
mod memory;
mod row;
mod sled_store;
mod transaction;

pub use config::StorageConfig;
pub use memory::MemoryStorage;
pub use row::Row;
pub use sled_store::SledStorage;
pub use transaction::Transaction;

use crate::error::Error;
use crate::record::Record;
use crate::value::{Identity, Value};

/// Record storage.
pub trait Storage {
    /// Allocate a fresh identity in the scope of `type_name`.
    ///
    /// Chains allocate through their topmost type so links never collide.
    fn allocate_identity(&mut self, type_name: &str) -> Result<Identity, Error>;

    /// Write one row, replacing any row with the same type and identity.
    fn put_row(&mut self, row: Row) -> Result<(), Error>;

    /// Read one row.
    fn get_row(&self, type_name: &str, identity: Identity) -> Result<Option<Row>, Error>;

    /// All rows of one type, in ascending identity order.
    fn scan_rows(&self, type_name: &str) -> Result<Vec<Row>, Error>;

    /// Write several rows as one unit.
    fn put_rows(&mut self, rows: Vec<Row>) -> Result<(), Error> {
        for row in rows {
            self.put_row(row)?;
        }
        Ok(())
    }

    /// Persist a draft under a freshly allocated identity.
    ///
    /// The draft's identity is ignored. Every link of the chain is written.
    fn create(&mut self, mut draft: Record) -> Result<Record, Error> {
        let identity = self.allocate_identity(draft.root_type())?;
        draft.set_identity(identity);
        self.put_rows(Row::split(&draft))?;
        Ok(draft)
    }

    /// Persist a record under its own identity. Fails if it already exists.
    fn insert(&mut self, record: &Record) -> Result<(), Error> {
        if self.get_row(&record.type_name, record.identity)?.is_some() {
            return Err(Error::Integrity {
                type_name: record.type_name.clone(),
                identity: record.identity,
                reason: "record already exists".into(),
            });
        }
        self.put_rows(Row::split(record))
    }

    /// Overwrite an existing record, every link included.
    fn update(&mut self, record: &Record) -> Result<(), Error> {
        if self.get_row(&record.type_name, record.identity)?.is_none() {
            return Err(Error::NotFound {
                type_name: record.type_name.clone(),
                identity: record.identity,
            });
        }
        self.put_rows(Row::split(record))
    }

    /// Read a record with its whole supertype chain.
    fn get(&self, type_name: &str, identity: Identity) -> Result<Option<Record>, Error> {
        match self.get_row(type_name, identity)? {
            Some(row) => assemble(self, row).map(Some),
            None => Ok(None),
        }
    }

    /// All records of one type, in ascending identity order.
    fn records(&self, type_name: &str) -> Result<Vec<Record>, Error> {
        self.scan_rows(type_name)?
            .into_iter()
            .map(|row| assemble(self, row))
            .collect()
    }

    /// Records of `type_name` whose `field` (anywhere on the chain) equals `value`.
    fn find(&self, type_name: &str, field: &str, value: &Value) -> Result<Vec<Record>, Error> {
        Ok(self
            .records(type_name)?
            .into_iter()
            .filter(|r| r.get(field) == Some(value))
            .collect())
    }

    /// Like [`find`](Storage::find), for lookups expected to be unique.
    fn find_one(
        &self,
        type_name: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Record>, Error> {
        let mut found = self.find(type_name, field, value)?;
        if found.len() > 1 {
            return Err(Error::AmbiguousLookup {
                type_name: type_name.to_string(),
                field: field.to_string(),
                reason: format!("{} records match {}", found.len(), value),
            });
        }
        Ok(found.pop())
    }

    /// Records of `type_name` whose relation `field` points at `target`.
    fn referencing(
        &self,
        type_name: &str,
        field: &str,
        target: Identity,
    ) -> Result<Vec<Record>, Error> {
        Ok(self
            .records(type_name)?
            .into_iter()
            .filter(|r| r.get(field).is_some_and(|v| v.references(target)))
            .collect())
    }

    /// Number of rows of one type.
    fn count(&self, type_name: &str) -> Result<usize, Error> {
        Ok(self.scan_rows(type_name)?.len())
    }
}

/// Attach the supertype rows to a row, recursively.
fn assemble<S: Storage + ?Sized>(storage: &S, row: Row) -> Result<Record, Error> {
    let parent = match &row.parent_type {
        Some(parent_type) => match storage.get_row(parent_type, row.identity)? {
            Some(parent_row) => Some(assemble(storage, parent_row)?),
            None => {
                return Err(Error::Integrity {
                    type_name: row.type_name.clone(),
                    identity: row.identity,
                    reason: format!("missing {parent_type} row"),
                })
            }
        },
        None => None,
    };
    Ok(row.into_record(parent))
}
