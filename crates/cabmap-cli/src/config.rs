//! Configuration file loading
//!
//! The file is TOML holding the fields of [`IndexConfig`]; anything left out
//! keeps its default. Command-line flags are applied on top.

use cabmap_index::IndexConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML deserialization error in {}: {source}", path.display())]
    TomlDeserialize {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Load the configuration at `path`, or the defaults when no file is given
pub fn load_config(path: Option<&Path>) -> Result<IndexConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(IndexConfig::default());
    };

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlDeserialize {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the configuration and apply command-line overrides
pub fn resolve_config(
    config_path: Option<&Path>,
    index_override: Option<&Path>,
) -> Result<IndexConfig, ConfigError> {
    let config = load_config(config_path)?;
    Ok(match index_override {
        Some(index) => config.with_index_path(index),
        None => config,
    })
}

/// Render a configuration as TOML
pub fn to_toml(config: &IndexConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}
