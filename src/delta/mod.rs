//! Delta engine
//!
//! A revision is stored as a [`DeltaRecord`] against the object it was
//! committed on top of: copies of byte ranges that already exist in the
//! parent, plus compressed literals for everything else.

mod encoder;
mod record;

pub use encoder::DeltaEncoder;
pub use record::{DeltaRecord, DeltaStats, Segment};
