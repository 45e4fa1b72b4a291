//! Error types for `quire.toml` loading.

use std::path::PathBuf;

/// Why a configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Not valid TOML, or a value of the wrong type.
    #[error("invalid quire.toml: {0}")]
    Parse(String),

    /// A field that must be non-empty is empty.
    #[error("`{0}` must not be empty")]
    MissingField(&'static str),

    /// A value is out of range.
    #[error("invalid setting: {0}")]
    Validation(String),

    /// `--mode` named a mode with no `[modes.<name>]` table.
    #[error("unknown mode '{0}'")]
    UnknownMode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_mode_names_the_mode() {
        let err = ConfigError::UnknownMode("handout".to_string());
        assert_eq!(err.to_string(), "unknown mode 'handout'");
    }

    #[test]
    fn missing_field_names_the_key() {
        let err = ConfigError::MissingField("toolchain.program");
        assert_eq!(err.to_string(), "`toolchain.program` must not be empty");
    }

    #[test]
    fn io_error_names_the_file() {
        let err = ConfigError::Io {
            path: PathBuf::from("/p/quire.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "cannot read /p/quire.toml: denied");
    }
}
