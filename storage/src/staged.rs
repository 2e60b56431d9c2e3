//! Copy-on-write staging over a base store.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::iter::Peekable;

use crate::{KVStore, Result};

/// A write overlay over a base [`KVStore`].
///
/// Reads fall through to the base store unless the key has been written
/// or deleted in the overlay. Writes never touch the base until
/// [`commit`](Self::commit); dropping the overlay discards them. This is
/// the per-block (and per-transaction) staging contract: a failed
/// transaction leaves the base store untouched.
#[derive(Debug)]
pub struct StagedStore<'a, S: KVStore> {
    base: &'a mut S,
    // `None` marks a staged deletion.
    overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, S: KVStore> StagedStore<'a, S> {
    pub fn new(base: &'a mut S) -> Self {
        Self {
            base,
            overlay: BTreeMap::new(),
        }
    }

    /// Apply the staged write set to the base store, in key order.
    pub fn commit(self) -> Result<()> {
        for (key, value) in self.overlay {
            match value {
                Some(value) => self.base.set(key, value)?,
                None => self.base.delete(&key)?,
            }
        }
        Ok(())
    }

    /// Number of staged writes and deletions.
    pub fn staged_len(&self) -> usize {
        self.overlay.len()
    }
}

impl<S: KVStore> KVStore for StagedStore<'_, S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.overlay.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.base.get(key),
        }
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.overlay.insert(key, Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.overlay.insert(key.to_vec(), None);
        Ok(())
    }

    fn iter_prefix<'a>(
        &'a self,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        let prefix = prefix.to_vec();
        let base = self.base.iter_prefix(&prefix).peekable();
        let overlay = self
            .overlay
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .peekable();
        Box::new(MergedIter { base, overlay })
    }
}

/// Ordered merge of the base iterator and the overlay; overlay entries
/// shadow base entries with the same key, staged deletions drop them.
struct MergedIter<B, O>
where
    B: Iterator<Item = (Vec<u8>, Vec<u8>)>,
    O: Iterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
{
    base: Peekable<B>,
    overlay: Peekable<O>,
}

impl<B, O> Iterator for MergedIter<B, O>
where
    B: Iterator<Item = (Vec<u8>, Vec<u8>)>,
    O: Iterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
{
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let side = match (self.base.peek(), self.overlay.peek()) {
                (None, None) => return None,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((bk, _)), Some((ok, _))) => bk.cmp(ok),
            };
            match side {
                Ordering::Less => return self.base.next(),
                Ordering::Equal => {
                    // Overlay shadows the base entry.
                    self.base.next();
                    if let Some((key, Some(value))) = self.overlay.next() {
                        return Some((key, value));
                    }
                }
                Ordering::Greater => {
                    if let Some((key, Some(value))) = self.overlay.next() {
                        return Some((key, value));
                    }
                }
            }
        }
    }
}
