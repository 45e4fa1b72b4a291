//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Loading is fail-safe: these errors are logged and turned into an empty
/// cache. Saving reports them to the caller.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing the cache file.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache file could not be parsed as valid JSON.
    #[error("failed to parse cache file {path}: {reason}")]
    Parse {
        /// The cache file path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The cache file was written by an incompatible format version.
    #[error("cache format version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The cache file path.
        path: PathBuf,
        /// The format version this build understands.
        expected: u32,
        /// The version found in the file.
        actual: u32,
    },

    /// A serialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CacheError::Io {
            path: PathBuf::from("/proj/.build_cache.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains(".build_cache.json"));
    }

    #[test]
    fn parse_display() {
        let err = CacheError::Parse {
            path: PathBuf::from("c.json"),
            reason: "unexpected EOF".to_string(),
        };
        assert!(err.to_string().contains("unexpected EOF"));
    }

    #[test]
    fn version_mismatch_display() {
        let err = CacheError::VersionMismatch {
            path: PathBuf::from("c.json"),
            expected: 2,
            actual: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 2"));
        assert!(msg.contains("got 1"));
    }
}
