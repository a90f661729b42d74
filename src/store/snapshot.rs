//! Single-file snapshots of an object store
//!
//! File format:
//! ```text
//! [HEADER: 64 bytes]
//!   - magic: 8 bytes ("DSTORE01")
//!   - version: 4 bytes (u32 LE)
//!   - flags: 4 bytes
//!   - object_count: 8 bytes (u64 LE)
//!   - head_present: 1 byte
//!   - head: 32 bytes
//!   - reserved: 7 bytes
//!
//! [OBJECTS: variable]
//!   - hash: 32 bytes
//!   - len: 8 bytes (u64 LE)
//!   - data: len bytes
//! ```
//!
//! Objects are written sorted by hash so equal stores produce equal files.

use crate::model::Hash;
use crate::store::ObjectStore;
use crate::{Error, Result, MAGIC, VERSION};
use bytes::Bytes;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const HEADER_SIZE: usize = 64;
const HEAD_FLAG_OFFSET: usize = 24;

impl ObjectStore {
    /// Write every object plus the HEAD pointer to `path`
    ///
    /// The snapshot is written beside the target and renamed over it, so a
    /// crash mid-write leaves the previous file intact.
    pub fn save(&self, path: impl AsRef<Path>, head: Option<Hash>) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");

        {
            let mut out = BufWriter::new(File::create(&tmp_path)?);

            let mut header = [0u8; HEADER_SIZE];
            header[0..8].copy_from_slice(MAGIC);
            header[8..12].copy_from_slice(&VERSION.to_le_bytes());
            // flags: 0
            header[16..24].copy_from_slice(&(self.len() as u64).to_le_bytes());
            if let Some(head) = head {
                header[HEAD_FLAG_OFFSET] = 1;
                header[HEAD_FLAG_OFFSET + 1..HEAD_FLAG_OFFSET + 1 + Hash::LEN]
                    .copy_from_slice(head.as_bytes());
            }
            out.write_all(&header)?;

            for hash in self.hashes() {
                let data = self.get(&hash)?;
                out.write_all(hash.as_bytes())?;
                out.write_all(&(data.len() as u64).to_le_bytes())?;
                out.write_all(&data)?;
            }

            out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        }

        fs::rename(&tmp_path, path)?;
        tracing::debug!(path = %path.display(), objects = self.len(), "saved snapshot");
        Ok(())
    }

    /// Read a snapshot written by [`ObjectStore::save`]
    ///
    /// Every object is rehashed on load; a mismatch is reported as corruption.
    pub fn load(path: impl AsRef<Path>) -> Result<(ObjectStore, Option<Hash>)> {
        let path = path.as_ref();
        let mut input = BufReader::new(File::open(path)?);

        let mut header = [0u8; HEADER_SIZE];
        input
            .read_exact(&mut header)
            .map_err(|_| Error::InvalidFile("Truncated header".into()))?;

        if &header[0..8] != MAGIC {
            return Err(Error::InvalidFile("Invalid magic bytes".into()));
        }

        let version = u32::from_le_bytes(array_at(&header, 8));
        if version != VERSION {
            return Err(Error::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }

        let object_count = u64::from_le_bytes(array_at(&header, 16));
        let head = match header[HEAD_FLAG_OFFSET] {
            0 => None,
            1 => Some(Hash::from_bytes(array_at(&header, HEAD_FLAG_OFFSET + 1))),
            other => {
                return Err(Error::InvalidFile(format!("Invalid head flag: {}", other)));
            }
        };

        let mut store = ObjectStore::new();
        for _ in 0..object_count {
            let mut hash_buf = [0u8; Hash::LEN];
            input.read_exact(&mut hash_buf)?;

            let mut len_buf = [0u8; 8];
            input.read_exact(&mut len_buf)?;
            let len = u64::from_le_bytes(len_buf);

            // Length is untrusted; grow the buffer only as bytes arrive
            let mut data = Vec::new();
            let read = (&mut input).take(len).read_to_end(&mut data)?;
            if read as u64 != len {
                return Err(Error::InvalidFile("Object length exceeds file size".into()));
            }

            store.insert_verified(Hash::from_bytes(hash_buf), Bytes::from(data))?;
        }

        if let Some(head) = head {
            if !store.contains(&head) {
                return Err(Error::Corruption(format!(
                    "HEAD {} not present in snapshot",
                    head
                )));
            }
        }

        tracing::debug!(path = %path.display(), objects = store.len(), "loaded snapshot");
        Ok((store, head))
    }
}

fn array_at<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}
