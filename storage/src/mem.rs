//! In-memory store used by tests and single-node hosts.

use std::collections::BTreeMap;

use crate::{KVStore, Result};

/// A [`BTreeMap`]-backed store. Iteration order is the map's key order,
/// which is ascending byte order.
#[derive(Debug, Default, Clone)]
pub struct MemStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KVStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.data.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.data.contains_key(key))
    }

    fn iter_prefix<'a>(
        &'a self,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        let prefix = prefix.to_vec();
        Box::new(
            self.data
                .range(prefix.clone()..)
                .take_while(move |(k, _)| k.starts_with(&prefix))
                .map(|(k, v)| (k.clone(), v.clone())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_is_ordered_by_key_bytes() {
        let mut store = MemStore::new();
        store.set(vec![2, 9], vec![1]).unwrap();
        store.set(vec![2, 1], vec![2]).unwrap();
        store.set(vec![2, 5], vec![3]).unwrap();
        store.set(vec![3, 0], vec![4]).unwrap();

        let keys: Vec<_> = store.iter_prefix(&[2]).map(|(k, _)| k).collect();
        assert_eq!(keys, vec![vec![2, 1], vec![2, 5], vec![2, 9]]);
    }

    #[test]
    fn delete_is_idempotent() {
        let mut store = MemStore::new();
        store.set(vec![1], vec![42]).unwrap();
        store.delete(&[1]).unwrap();
        store.delete(&[1]).unwrap();
        assert!(!store.has(&[1]).unwrap());
    }
}
