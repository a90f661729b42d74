//! In-memory content-addressed object store

use crate::model::Hash;
use crate::{Error, Result};
use bytes::Bytes;
use std::collections::HashMap;

/// Maps the hash of some bytes to those bytes
///
/// The store never interprets what it holds. Objects are immutable once
/// written, so storing the same bytes twice is a no-op.
#[derive(Default, Clone)]
pub struct ObjectStore {
    objects: HashMap<Hash, Bytes>,
}

impl ObjectStore {
    pub fn new() -> Self {
        ObjectStore {
            objects: HashMap::new(),
        }
    }

    /// Store bytes, returns their hash
    pub fn put(&mut self, data: &[u8]) -> Hash {
        let hash = Hash::digest(data);
        self.objects
            .entry(hash)
            .or_insert_with(|| Bytes::copy_from_slice(data));
        tracing::trace!(hash = %hash.short(), size = data.len(), "put object");
        hash
    }

    /// Retrieve the exact bytes stored under `hash`
    pub fn get(&self, hash: &Hash) -> Result<Bytes> {
        self.objects
            .get(hash)
            .cloned()
            .ok_or_else(|| Error::NotFound(hash.to_hex()))
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.objects.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Total bytes across all stored objects
    pub fn total_bytes(&self) -> u64 {
        self.objects.values().map(|b| b.len() as u64).sum()
    }

    /// All hashes, sorted
    pub fn hashes(&self) -> Vec<Hash> {
        let mut hashes: Vec<Hash> = self.objects.keys().copied().collect();
        hashes.sort();
        hashes
    }

    /// Insert bytes loaded from disk after checking they match their key
    pub(crate) fn insert_verified(&mut self, hash: Hash, data: Bytes) -> Result<()> {
        let actual = Hash::digest(&data);
        if actual != hash {
            tracing::warn!(expected = %hash.short(), actual = %actual.short(), "rejecting object");
            return Err(Error::Corruption(format!(
                "object {} hashes to {}",
                hash, actual
            )));
        }
        self.objects.insert(hash, data);
        Ok(())
    }

    /// Overwrite stored bytes without rehashing; tests use this to simulate
    /// on-disk damage.
    #[cfg(test)]
    pub(crate) fn replace_unchecked(&mut self, hash: Hash, data: Vec<u8>) {
        self.objects.insert(hash, Bytes::from(data));
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}
