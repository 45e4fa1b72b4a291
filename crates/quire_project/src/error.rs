//! Error types for discovery and the discovery index.

use std::path::PathBuf;

/// Errors raised while discovering units or reading the discovery index.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The configured source root does not exist.
    #[error("source root {0} does not exist")]
    RootNotFound(PathBuf),

    /// The discovery index could not be read or written.
    #[error("discovery index I/O error at {path}: {source}")]
    Index {
        /// The index file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A line of the discovery index is malformed.
    #[error("{path}:{line}: {reason}")]
    IndexLine {
        /// The index file path.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What is wrong with the line.
        reason: String,
    },
}
