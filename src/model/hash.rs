//! Content hash used as the storage key for every object

use crate::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 32-byte BLAKE3 digest of an object's stored bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; Hash::LEN]);

impl Hash {
    /// Digest width in bytes
    pub const LEN: usize = 32;

    /// All-zero sentinel; never produced by hashing real content
    pub const ZERO: Hash = Hash([0u8; Hash::LEN]);

    pub fn from_bytes(bytes: [u8; Hash::LEN]) -> Self {
        Hash(bytes)
    }

    /// Hash a byte slice
    pub fn digest(data: &[u8]) -> Self {
        Hash(*blake3::hash(data).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; Hash::LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a full-length hex digest
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = [0u8; Hash::LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| Error::InvalidHash(format!("{s}: {e}")))?;
        Ok(Hash(bytes))
    }

    /// First 7 hex chars, for display
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }
}

impl FromStr for Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Hash::from_hex(s)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short())
    }
}

/// Serializes as the hex digest
impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
