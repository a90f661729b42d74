//! High-level Repository API
//!
//! A [`Repository`] owns one object store and one HEAD pointer. Commits are
//! stored as deltas against HEAD; reads resolve the delta chain through the
//! parent hash recorded in each delta, so every commit stays readable no
//! matter where HEAD has moved since.

use crate::delta::{DeltaEncoder, DeltaRecord, DeltaStats};
use crate::model::{Config, Hash};
use crate::store::{Object, ObjectKind, ObjectStore};
use crate::{Error, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Store and HEAD, guarded together so readers never see HEAD naming an
/// object that is not stored yet.
struct State {
    store: ObjectStore,
    head: Option<Hash>,
}

/// The main repository interface
///
/// Provides:
/// - Content-addressed inserts (`hash_object`)
/// - Delta-compressed commits (`commit`)
/// - Transparent reconstruction (`get_object`)
/// - History and inspection of stored objects
pub struct Repository {
    config: Config,
    encoder: DeltaEncoder,
    /// Snapshot file backing this repository, if any
    path: Option<PathBuf>,
    state: RwLock<State>,
}

/// Description of a stored object
#[derive(Clone, Debug, Serialize)]
pub struct ObjectInfo {
    pub hash: Hash,
    pub kind: ObjectKind,
    /// Bytes held by the store, including the kind tag
    pub stored_size: usize,
    /// Length of the revision this object reconstructs to
    pub content_size: u64,
    pub parent: Option<Hash>,
    pub delta: Option<DeltaStats>,
}

/// Repository-wide counters
#[derive(Clone, Debug, Serialize)]
pub struct RepoStats {
    pub objects: usize,
    pub stored_bytes: u64,
    pub head: Option<Hash>,
}

impl Repository {
    /// Create an empty repository held in memory
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, None, ObjectStore::new(), None))
    }

    /// In-memory repository with default settings
    pub fn in_memory() -> Self {
        // Config::default() always passes validate()
        Self::from_parts(Config::default(), None, ObjectStore::new(), None)
    }

    /// Open the snapshot at `path`, or start empty if it does not exist yet
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();
        let (store, head) = if path.exists() {
            ObjectStore::load(&path)?
        } else {
            (ObjectStore::new(), None)
        };
        Ok(Self::from_parts(config, Some(path), store, head))
    }

    /// Assemble a repository from a config that has already been validated
    fn from_parts(
        config: Config,
        path: Option<PathBuf>,
        store: ObjectStore,
        head: Option<Hash>,
    ) -> Self {
        Repository {
            encoder: DeltaEncoder::from_config(&config),
            config,
            path,
            state: RwLock::new(State { store, head }),
        }
    }

    /// Write the snapshot back to the file this repository was opened from
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| Error::Config("repository has no backing file".into()))?;
        let state = self.state.read();
        state.store.save(path, state.head)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // === Objects ===

    /// Store `data` as a full object and return its hash
    ///
    /// Does not move HEAD.
    pub fn hash_object(&self, data: &[u8]) -> Hash {
        let encoded = Object::full(data).encode();
        self.state.write().store.put(&encoded)
    }

    /// Fetch a revision by hex hash, reconstructing deltas as needed
    ///
    /// A string that is not the hash of a stored object, including one that
    /// is not a well-formed hash at all, is reported as `NotFound`.
    pub fn get_object(&self, hash: &str) -> Result<Vec<u8>> {
        let hash = Hash::from_hex(hash).map_err(|_| Error::NotFound(hash.to_string()))?;
        self.get(&hash)
    }

    /// Fetch a revision by hash, reconstructing deltas as needed
    pub fn get(&self, hash: &Hash) -> Result<Vec<u8>> {
        let state = self.state.read();
        reconstruct(&state.store, hash)
    }

    // === Commits ===

    /// Record `content` as the next revision and move HEAD to it
    ///
    /// The first commit is stored in full. Later commits are stored as a
    /// delta against HEAD unless delta encoding is disabled. On error
    /// nothing is stored and HEAD does not move.
    pub fn commit(&self, content: &[u8]) -> Result<Hash> {
        let mut state = self.state.write();

        let encoded = match state.head {
            Some(parent) if self.config.delta_encoding => {
                let base = reconstruct(&state.store, &parent)?;
                let record = self.encoder.encode(parent, &base, content)?;
                let stats = record.stats();
                tracing::debug!(
                    parent = %parent.short(),
                    copies = stats.copy_segments,
                    literals = stats.literal_segments,
                    copied_bytes = stats.copied_bytes,
                    "encoded delta"
                );
                Object::delta(&record.encode()).encode()
            }
            _ => Object::full(content).encode(),
        };

        let hash = state.store.put(&encoded);
        state.head = Some(hash);

        tracing::debug!(
            hash = %hash.short(),
            content_size = content.len(),
            stored_size = encoded.len(),
            "committed"
        );
        Ok(hash)
    }

    /// Hash of the latest commit
    pub fn head(&self) -> Option<Hash> {
        self.state.read().head
    }

    /// Commits from `hash` back to its root, newest first
    pub fn history(&self, hash: &Hash) -> Result<Vec<Hash>> {
        let state = self.state.read();
        let mut chain = vec![*hash];
        let mut current = *hash;

        while let Some(parent) = parent_of(&state.store, &current)? {
            if chain.len() > state.store.len() {
                return Err(Error::Corruption(format!("delta chain from {} loops", hash)));
            }
            chain.push(parent);
            current = parent;
        }
        Ok(chain)
    }

    /// Describe a stored object without reconstructing it
    pub fn inspect(&self, hash: &Hash) -> Result<ObjectInfo> {
        let state = self.state.read();
        let data = state.store.get(hash)?;
        let object = Object::decode(&data)?;

        let info = match object.kind {
            ObjectKind::Full => ObjectInfo {
                hash: *hash,
                kind: object.kind,
                stored_size: data.len(),
                content_size: object.payload.len() as u64,
                parent: None,
                delta: None,
            },
            ObjectKind::Delta => {
                let record = DeltaRecord::decode(object.payload)?;
                ObjectInfo {
                    hash: *hash,
                    kind: object.kind,
                    stored_size: data.len(),
                    content_size: record.output_len(),
                    parent: Some(record.parent),
                    delta: Some(record.stats()),
                }
            }
        };
        Ok(info)
    }

    pub fn stats(&self) -> RepoStats {
        let state = self.state.read();
        RepoStats {
            objects: state.store.len(),
            stored_bytes: state.store.total_bytes(),
            head: state.head,
        }
    }

    #[cfg(test)]
    fn with_store_mut<T>(&self, f: impl FnOnce(&mut ObjectStore) -> T) -> T {
        f(&mut self.state.write().store)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn parent_of(store: &ObjectStore, hash: &Hash) -> Result<Option<Hash>> {
    let data = store.get(hash)?;
    let object = Object::decode(&data)?;
    Ok(match object.kind {
        ObjectKind::Full => None,
        ObjectKind::Delta => Some(DeltaRecord::decode(object.payload)?.parent),
    })
}

/// Follow parent links down to a full object, then replay the deltas
/// back up. Iterative, so long histories do not grow the call stack.
fn reconstruct(store: &ObjectStore, hash: &Hash) -> Result<Vec<u8>> {
    let mut pending = Vec::new();
    let mut current = *hash;

    let root = loop {
        let data = store.get(&current)?;
        let object = Object::decode(&data)?;
        match object.kind {
            ObjectKind::Full => break object.payload.to_vec(),
            ObjectKind::Delta => {
                if pending.len() > store.len() {
                    return Err(Error::Corruption(format!("delta chain from {} loops", hash)));
                }
                let record = DeltaRecord::decode(object.payload)?;
                current = record.parent;
                pending.push(record);
            }
        }
    };

    tracing::trace!(hash = %hash.short(), depth = pending.len(), "reconstructing");
    pending
        .iter()
        .rev()
        .try_fold(root, |base, record| record.apply(&base).map_err(Error::from))
}
