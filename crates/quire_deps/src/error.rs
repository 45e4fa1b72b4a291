//! Error types for dependency extraction.

use std::path::PathBuf;

/// Errors raised while reading units or writing declared-dependency listings.
///
/// Staleness checks never return these: unreadable dependencies are skipped.
#[derive(Debug, thiserror::Error)]
pub enum DepsError {
    /// Reading a unit or writing a listing failed.
    #[error("dependency I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
