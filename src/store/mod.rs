//! Content-addressed object store
//!
//! This module implements the storage layer: an in-memory map from
//! BLAKE3 hash to bytes, the tagged object framing layered on top of it,
//! and single-file snapshots for persistence between runs.

mod memory;
mod object;
mod snapshot;

pub use memory::ObjectStore;
pub use object::{Object, ObjectKind};
