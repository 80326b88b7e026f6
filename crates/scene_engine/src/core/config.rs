//! Scene configuration
//!
//! Small, serializable knobs for the scene graph. Loadable from TOML so
//! applications can tune capacity and diagnostics without recompiling.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration for a [`crate::scene::Scene`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Initial node arena capacity
    pub node_capacity: usize,

    /// Initial component arena capacity
    pub component_capacity: usize,

    /// Log structural violations (cycles, missing members) as errors
    /// instead of warnings
    ///
    /// Violations remain no-ops either way; a frame is never crashed over
    /// graph bookkeeping.
    pub strict_structure: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            node_capacity: 256,
            component_capacity: 512,
            strict_structure: false,
        }
    }
}

impl SceneConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to load
        path: String,
        /// Underlying io error
        source: std::io::Error,
    },

    /// The config file is not valid TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = SceneConfig::from_toml_str("strict_structure = true").unwrap();
        assert!(config.strict_structure);
        assert_eq!(config.node_capacity, SceneConfig::default().node_capacity);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(SceneConfig::from_toml_str("node_capacity = \"many\"").is_err());
    }
}
