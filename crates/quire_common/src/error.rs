//! Error types for path and module resolution.

use std::path::PathBuf;

/// Errors raised when a path cannot be placed in the project layout.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// The path does not live under the configured source root.
    #[error("{path} is not under the source root {root}")]
    OutsideRoot {
        /// The offending path.
        path: PathBuf,
        /// The source root it was resolved against.
        root: PathBuf,
    },

    /// The path sits directly in the source root and so belongs to no module.
    #[error("{0} is not inside a module directory")]
    NoModule(PathBuf),

    /// Creating a mirrored output directory failed.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_root_display() {
        let err = LayoutError::OutsideRoot {
            path: PathBuf::from("/tmp/x.tex"),
            root: PathBuf::from("/proj/src"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/x.tex"));
        assert!(msg.contains("/proj/src"));
    }

    #[test]
    fn no_module_display() {
        let err = LayoutError::NoModule(PathBuf::from("src/loose_main.tex"));
        assert!(err.to_string().contains("not inside a module"));
    }
}
