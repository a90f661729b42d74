//! Core data model types for deltastore

mod config;
mod hash;

pub use config::Config;
pub use hash::Hash;
