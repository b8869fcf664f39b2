//! Config file parsing
//!
//! Loads a [`PagerConfig`] from YAML or JSON, rejecting unknown keys and
//! validating every option before returning.

use super::types::PagerConfig;
use crate::error::{Error, Result, ResultExt};
use std::fs;
use std::path::Path;

/// Serialization format of a config document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML document (also accepts JSON)
    Yaml,
    /// JSON document
    Json,
}

impl ConfigFormat {
    /// Guess the format from a file extension (YAML unless `.json`)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Load a config from a YAML or JSON file
pub fn load_config(path: impl AsRef<Path>) -> Result<PagerConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    load_config_from_str(&contents, ConfigFormat::from_path(path))
}

/// Load a config from a string in the given format
pub fn load_config_from_str(contents: &str, format: ConfigFormat) -> Result<PagerConfig> {
    let config: PagerConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(contents)?,
        ConfigFormat::Json => serde_json::from_str(contents)?,
    };

    config.validate()?;
    Ok(config)
}

impl PagerConfig {
    /// Parse and validate a YAML config
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        load_config_from_str(yaml, ConfigFormat::Yaml)
    }

    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self> {
        load_config_from_str(json, ConfigFormat::Json)
    }

    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        load_config(path)
    }
}
