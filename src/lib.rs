//! # deltastore
//!
//! A content-addressed object store with delta-compressed history.
//!
//! Every object is keyed by the BLAKE3 hash of its bytes. Successive
//! revisions are stored as deltas against the previous one: whole chunks
//! that already exist in the parent become copy references, everything
//! else becomes a zstd-compressed literal. Reading a revision replays its
//! delta chain back from the nearest full object.
//!
//! ## Example
//!
//! ```
//! use deltastore::Repository;
//!
//! let repo = Repository::in_memory();
//! let first = repo.commit(b"Initial content of a large file.")?;
//! let second = repo.commit(b"Initial content of a large file. Some changes here.")?;
//!
//! assert_eq!(repo.get_object(&second.to_hex())?, b"Initial content of a large file. Some changes here.");
//! assert_eq!(repo.history(&second)?, vec![second, first]);
//! # Ok::<(), deltastore::Error>(())
//! ```

pub mod delta;
pub mod model;
pub mod store;

mod error;
mod repository;

pub use delta::{DeltaEncoder, DeltaRecord, DeltaStats, Segment};
pub use error::{DeltaError, Error, Result};
pub use model::{Config, Hash};
pub use repository::{ObjectInfo, RepoStats, Repository};
pub use store::{Object, ObjectKind, ObjectStore};

/// Snapshot format version
pub const VERSION: u32 = 1;

/// Magic bytes for snapshot files
pub const MAGIC: &[u8; 8] = b"DSTORE01";
