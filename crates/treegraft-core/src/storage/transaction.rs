//! Buffered unit of work over any storage backend.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::{Row, Storage};
use crate::error::Error;
use crate::value::Identity;

/// A transaction buffering every write until [`commit`](Transaction::commit).
///
/// Reads see the transaction's own uncommitted writes layered over the base
/// store. Dropping a transaction without committing discards the buffer.
/// Identity allocation goes straight to the base store and is not rolled
/// back, like a database sequence.
pub struct Transaction<'a> {
    base: &'a mut dyn Storage,
    /// Local cache for uncommitted writes.
    write_cache: BTreeMap<(String, Identity), Row>,
    committed: bool,
}

impl<'a> Transaction<'a> {
    /// Start a transaction over `base`.
    pub fn begin(base: &'a mut dyn Storage) -> Self {
        Self {
            base,
            write_cache: BTreeMap::new(),
            committed: false,
        }
    }

    /// Run `f` inside a transaction, committing only if it succeeds.
    pub fn atomic<T>(
        base: &'a mut dyn Storage,
        f: impl FnOnce(&mut Transaction<'a>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut tx = Transaction::begin(base);
        let out = f(&mut tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Number of buffered rows.
    pub fn pending(&self) -> usize {
        self.write_cache.len()
    }

    /// Apply every buffered row to the base store as one unit.
    pub fn commit(mut self) -> Result<usize, Error> {
        let rows: Vec<Row> = std::mem::take(&mut self.write_cache)
            .into_values()
            .collect();
        let count = rows.len();
        self.base.put_rows(rows)?;
        self.committed = true;
        info!(rows = count, "transaction committed");
        Ok(count)
    }

    /// Discard every buffered row.
    pub fn rollback(mut self) {
        let discarded = std::mem::take(&mut self.write_cache).len();
        self.committed = true;
        debug!(rows = discarded, "transaction rolled back");
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.write_cache.is_empty() {
            debug!(
                rows = self.write_cache.len(),
                "transaction dropped without commit, discarding writes"
            );
        }
    }
}

impl Storage for Transaction<'_> {
    fn allocate_identity(&mut self, type_name: &str) -> Result<Identity, Error> {
        self.base.allocate_identity(type_name)
    }

    fn put_row(&mut self, row: Row) -> Result<(), Error> {
        self.write_cache
            .insert((row.type_name.clone(), row.identity), row);
        Ok(())
    }

    fn get_row(&self, type_name: &str, identity: Identity) -> Result<Option<Row>, Error> {
        // Check write cache first (uncommitted writes in this tx)
        if let Some(row) = self.write_cache.get(&(type_name.to_string(), identity)) {
            return Ok(Some(row.clone()));
        }
        self.base.get_row(type_name, identity)
    }

    fn scan_rows(&self, type_name: &str) -> Result<Vec<Row>, Error> {
        let mut rows: BTreeMap<Identity, Row> = self
            .base
            .scan_rows(type_name)?
            .into_iter()
            .map(|row| (row.identity, row))
            .collect();

        let start = (type_name.to_string(), Identity(0));
        let end = (type_name.to_string(), Identity(u64::MAX));
        for ((_, identity), row) in self.write_cache.range(start..=end) {
            rows.insert(*identity, row.clone());
        }

        Ok(rows.into_values().collect())
    }
}
