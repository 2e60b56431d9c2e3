//! Local cache of account sequence numbers.
//!
//! Wallets sending several asynchronous transactions need the next
//! sequence without waiting for each one to commit; the cache keeps the
//! last used value per key name.

use meridian_storage::KVStore;

use crate::{ClientError, CoreContext, Result};

/// The sequence cache contract. The engine core never touches this.
pub trait SequenceCache {
    fn has(&self, name: &str) -> Result<bool>;
    fn get(&self, name: &str) -> Result<Option<u64>>;
    fn set(&mut self, name: &str, sequence: u64) -> Result<()>;
}

/// A [`SequenceCache`] over any ordered key/value store, keyed by
/// `<name>.info` with big-endian values.
#[derive(Debug)]
pub struct StoreSequenceCache<S> {
    store: S,
}

impl<S: KVStore> StoreSequenceCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

fn sequence_key(name: &str) -> Vec<u8> {
    format!("{}.info", name).into_bytes()
}

impl<S: KVStore> SequenceCache for StoreSequenceCache<S> {
    fn has(&self, name: &str) -> Result<bool> {
        Ok(self.store.has(&sequence_key(name))?)
    }

    fn get(&self, name: &str) -> Result<Option<u64>> {
        match self.store.get(&sequence_key(name))? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    ClientError::Query(format!(
                        "corrupt sequence entry for {}",
                        name
                    ))
                })?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    fn set(&mut self, name: &str, sequence: u64) -> Result<()> {
        self.store
            .set(sequence_key(name), sequence.to_be_bytes().to_vec())?;
        Ok(())
    }
}

/// Fill a missing sequence number: prefer the local cache, fall back to
/// querying the node and remember the answer.
pub fn ensure_sequence(
    ctx: CoreContext,
    cache: &mut impl SequenceCache,
    query: impl FnOnce(&str) -> Result<u64>,
) -> Result<CoreContext> {
    if ctx.sequence.is_some() {
        return Ok(ctx);
    }
    if let Some(sequence) = cache.get(&ctx.from_address_name)? {
        return Ok(ctx.with_sequence(sequence));
    }
    let sequence = query(&ctx.from_address_name)?;
    cache.set(&ctx.from_address_name, sequence)?;
    Ok(ctx.with_sequence(sequence))
}
