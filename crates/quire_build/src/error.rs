//! Error types for build execution.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that stop a build before any job starts.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The toolchain program is not on `PATH` and not an existing file.
    #[error("toolchain program `{0}` not found")]
    ToolchainNotFound(String),

    /// The worker pool could not be created.
    #[error("failed to create worker pool: {0}")]
    Pool(String),

    /// The interrupt handler could not be installed.
    #[error("failed to install interrupt handler: {0}")]
    Interrupt(String),
}

/// Why a single compilation job failed.
///
/// Converted into the failure detail of a
/// [`CompileResult`](crate::CompileResult); never escapes the job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Filesystem work around the toolchain failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An output directory could not be resolved or created.
    #[error(transparent)]
    Layout(#[from] quire_common::LayoutError),

    /// The toolchain process could not be started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The toolchain exited unsuccessfully.
    #[error("{program} exited with {}", .code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")))]
    Exit {
        /// Program that was invoked.
        program: String,
        /// Exit code, absent when killed by a signal.
        code: Option<i32>,
    },

    /// The toolchain ran longer than allowed and was killed.
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The toolchain reported success but produced no artifact.
    #[error("exit code 0 but no artifact at {}", .0.display())]
    MissingArtifact(PathBuf),

    /// The job panicked.
    #[error("internal error: {0}")]
    Panic(String),
}
