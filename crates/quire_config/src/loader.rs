//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::QuireConfig;
use std::path::Path;

/// Name of the configuration file at the project root.
pub const CONFIG_FILE: &str = "quire.toml";

/// Loads and validates `quire.toml` from a project directory.
///
/// A project without a `quire.toml` uses the built-in defaults.
pub fn load_config(project_dir: &Path) -> Result<QuireConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(QuireConfig::default());
    }
    load_config_file(&config_path)
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<QuireConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `quire.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<QuireConfig, ConfigError> {
    let config: QuireConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
fn validate_config(config: &QuireConfig) -> Result<(), ConfigError> {
    if config.toolchain.program.trim().is_empty() {
        return Err(ConfigError::MissingField("toolchain.program"));
    }
    if config.discovery.main_suffix.is_empty() {
        return Err(ConfigError::MissingField("discovery.main_suffix"));
    }
    if config.paths.source.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("paths.source"));
    }
    if config.toolchain.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "toolchain.timeout_secs must be greater than zero".to_string(),
        ));
    }
    if config.discovery.max_depth == 0 {
        return Err(ConfigError::Validation(
            "discovery.max_depth must be at least 1".to_string(),
        ));
    }
    for name in config.modes.keys() {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ConfigError::Validation(format!(
                "mode name '{name}' may only contain letters, digits, '-' and '_'"
            )));
        }
    }
    Ok(())
}
