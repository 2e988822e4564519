//! The key-value store contract and an in-memory implementation.

use crate::error::{Error, Result};
use crate::hash::Digest;
use std::collections::HashMap;
use std::sync::RwLock;

/// Content-addressed key-value store.
///
/// Keys are object digests and values are canonical object bytes; the store
/// never interprets either. Implementations must satisfy:
/// - `put` of a value identical to the one already stored under the key is a
///   no-op, not an error;
/// - `put` of a *different* value under an existing key fails with
///   [`Error::KeyConflict`] and leaves the stored value untouched.
pub trait KvStore: Send + Sync {
    /// Check whether a key exists.
    fn has(&self, key: &Digest) -> Result<bool>;

    /// Store a value under a key.
    fn put(&self, key: &Digest, value: &[u8]) -> Result<()>;

    /// Read a value. Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &Digest) -> Result<Option<Vec<u8>>>;

    /// Delete a key. Returns `true` if it existed.
    fn delete(&self, key: &Digest) -> Result<bool>;
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn has(&self, key: &Digest) -> Result<bool> {
        (**self).has(key)
    }

    fn put(&self, key: &Digest, value: &[u8]) -> Result<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &Digest) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn delete(&self, key: &Digest) -> Result<bool> {
        (**self).delete(key)
    }
}

/// `HashMap`-backed store for tests, dry runs and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<Digest, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|value| value.len() as u64)
            .sum()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<Digest> {
        let mut keys: Vec<Digest> = self
            .objects
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl KvStore for MemoryStore {
    fn has(&self, key: &Digest) -> Result<bool> {
        Ok(self.objects.read().expect("lock poisoned").contains_key(key))
    }

    fn put(&self, key: &Digest, value: &[u8]) -> Result<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        match map.get(key) {
            Some(existing) if existing.as_slice() == value => Ok(()),
            Some(_) => Err(Error::key_conflict(key.to_hex())),
            None => {
                map.insert(key.clone(), value.to_vec());
                Ok(())
            }
        }
    }

    fn get(&self, key: &Digest) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.read().expect("lock poisoned").get(key).cloned())
    }

    fn delete(&self, key: &Digest) -> Result<bool> {
        Ok(self
            .objects
            .write()
            .expect("lock poisoned")
            .remove(key)
            .is_some())
    }
}
