//! Persistent storage backed by sled.

use sled::{Batch, Db, Tree};
use tracing::debug;

use super::{Row, Storage, StorageConfig};
use crate::error::Error;
use crate::value::Identity;

/// Tree name for record rows.
const ROWS_TREE: &str = "rows";

/// Tree name for per-type identity sequences.
const SEQUENCES_TREE: &str = "sequences";

/// Storage persisted in a sled database.
///
/// Rows are keyed by `type_name ++ 0x00 ++ identity (big-endian)`, so a
/// prefix scan yields one type's rows in identity order.
pub struct SledStorage {
    db: Db,
    rows: Tree,
    sequences: Tree,
}

impl SledStorage {
    /// Open or create a store with the given configuration.
    pub fn open(config: &StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let rows = db.open_tree(ROWS_TREE)?;
        let sequences = db.open_tree(SEQUENCES_TREE)?;
        debug!(
            path = %config.path.display(),
            recovered = db.was_recovered(),
            "opened sled store"
        );

        Ok(Self {
            db,
            rows,
            sequences,
        })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    /// Raise the type's sequence so it is at least `identity`.
    fn bump_sequence(&self, type_name: &str, identity: Identity) -> Result<(), Error> {
        self.sequences
            .fetch_and_update(type_name.as_bytes(), |old| {
                let current = old.map(decode_u64).unwrap_or(0);
                Some(current.max(identity.get()).to_be_bytes().to_vec())
            })?;
        Ok(())
    }
}

impl Storage for SledStorage {
    fn allocate_identity(&mut self, type_name: &str) -> Result<Identity, Error> {
        let next = self
            .sequences
            .update_and_fetch(type_name.as_bytes(), |old| {
                let current = old.map(decode_u64).unwrap_or(0);
                Some((current + 1).to_be_bytes().to_vec())
            })?;
        Ok(Identity(next.as_deref().map(decode_u64).unwrap_or(1)))
    }

    fn put_row(&mut self, row: Row) -> Result<(), Error> {
        self.bump_sequence(&row.type_name, row.identity)?;
        self.rows
            .insert(row_key(&row.type_name, row.identity), row.to_bytes()?)?;
        Ok(())
    }

    fn put_rows(&mut self, rows: Vec<Row>) -> Result<(), Error> {
        let mut batch = Batch::default();
        for row in &rows {
            self.bump_sequence(&row.type_name, row.identity)?;
            batch.insert(row_key(&row.type_name, row.identity), row.to_bytes()?);
        }
        self.rows.apply_batch(batch)?;
        Ok(())
    }

    fn get_row(&self, type_name: &str, identity: Identity) -> Result<Option<Row>, Error> {
        match self.rows.get(row_key(type_name, identity))? {
            Some(bytes) => Ok(Some(Row::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_rows(&self, type_name: &str) -> Result<Vec<Row>, Error> {
        self.rows
            .scan_prefix(type_prefix(type_name))
            .map(|item| {
                let (_, bytes) = item?;
                Row::from_bytes(&bytes)
            })
            .collect()
    }
}

fn type_prefix(type_name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(type_name.len() + 1);
    key.extend_from_slice(type_name.as_bytes());
    key.push(0);
    key
}

fn row_key(type_name: &str, identity: Identity) -> Vec<u8> {
    let mut key = type_prefix(type_name);
    key.extend_from_slice(&identity.to_be_bytes());
    key
}

fn decode_u64(bytes: &[u8]) -> u64 {
    <[u8; 8]>::try_from(bytes)
        .map(u64::from_be_bytes)
        .unwrap_or(0)
}
