//! Ordered key/value storage for the Meridian ledger.
//!
//! The bonding engine is written against the [`KVStore`] trait; consensus
//! replication requires nothing of the backend beyond byte-ordered
//! iteration and atomic commit, which [`StagedStore`] provides on top of
//! any base store.

mod mem;
mod staged;

pub use mem::MemStore;
pub use staged::StagedStore;

use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Storage functions result
pub type Result<T> = std::result::Result<T, StoreError>;

/// An ordered key/value store.
///
/// Iteration order is ascending over raw key bytes; the engine's index
/// keys are laid out so that this order is semantic.
pub trait KVStore {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    /// Delete the value stored under `key`. Deleting an absent key is a
    /// no-op.
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Whether any value is stored under `key`.
    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Iterate all `(key, value)` pairs whose key starts with `prefix`,
    /// in ascending key order.
    fn iter_prefix<'a>(
        &'a self,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>;
}

impl<S: KVStore + ?Sized> KVStore for &mut S {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        (**self).delete(key)
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        (**self).has(key)
    }

    fn iter_prefix<'a>(
        &'a self,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        (**self).iter_prefix(prefix)
    }
}
