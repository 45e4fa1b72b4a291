//! Parsing and validation of `quire.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`QuireConfig`] with defaults matching the conventional `src/ build/ logs/ pdfs/`
//! layout, toolchain flags, dependency scanning rules and build modes.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use types::*;
