//! Error types for deltastore

use thiserror::Error;

/// Result type alias for deltastore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in deltastore operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Corrupt delta: {0}")]
    CorruptDelta(#[from] DeltaError),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Invalid store file: {0}")]
    InvalidFile(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// True for failures while parsing or expanding a delta record,
    /// including decompression failures of literal payloads.
    pub fn is_corrupt_delta(&self) -> bool {
        matches!(self, Error::CorruptDelta(_))
    }
}

/// Ways a delta record can fail to parse or reconstruct
#[derive(Error, Debug)]
pub enum DeltaError {
    #[error("record truncated while reading {0}")]
    Truncated(&'static str),

    #[error("unknown segment tag: {0:#04x}")]
    UnknownSegment(u8),

    #[error("{0} trailing bytes after last segment")]
    TrailingBytes(usize),

    #[error("copy range {offset}+{len} exceeds base of {base_len} bytes")]
    CopyOutOfRange {
        offset: u64,
        len: u64,
        base_len: usize,
    },

    #[error("literal expanded to {found} bytes, expected {expected}")]
    LengthMismatch { expected: u64, found: u64 },

    #[error("decompression failed: {0}")]
    Decompression(#[source] std::io::Error),
}

impl DeltaError {
    /// True when the underlying compressed bytes were not valid
    pub fn is_decompression_failure(&self) -> bool {
        matches!(self, DeltaError::Decompression(_))
    }
}
