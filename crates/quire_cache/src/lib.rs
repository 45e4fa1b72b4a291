//! Persistent build cache for incremental builds.
//!
//! The cache maps each unit's key to the source modification time recorded
//! at its last successful build. It is the only state carried between runs;
//! everything else is recomputed from the filesystem.

#![warn(missing_docs)]

pub mod cache;
pub mod error;

pub use cache::{BuildCache, CACHE_FORMAT_VERSION};
pub use error::CacheError;
