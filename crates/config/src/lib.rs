// Configuration Management
//
// This crate handles all configuration loading for the report generator.
// It provides:
// - Configuration structs and deserialization
// - File loading logic
// - Environment overrides and default values
//
// This keeps configuration concerns separate from the report logic.

use std::path::Path;
use thiserror::Error;

pub mod types;

// Re-export all configuration types
pub use types::*;

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/config.yaml",
    "config.yaml",
    "config/default.yaml",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read configuration file: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {source}")]
    ParseError {
        #[from]
        source: serde_yaml::Error,
    },

    #[error("Invalid environment configuration: {0}")]
    InvalidEnv(String),
}

/// Main configuration loading interface
impl ReportConfig {
    /// Load configuration from YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ReportConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from an explicit path or the default locations,
    /// then apply environment overrides
    ///
    /// Unlike an explicit path, a missing default file is not an error: the
    /// built-in defaults are used instead.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit_path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            }
            Some(path) => Self::load_from_file(path)?,
            None => match DEFAULT_CONFIG_PATHS
                .iter()
                .find(|path| Path::new(path).exists())
            {
                Some(path) => Self::load_from_file(path)?,
                None => Self::default(),
            },
        };

        config
            .apply_env_overrides()
            .map_err(ConfigError::InvalidEnv)?;
        Ok(config)
    }
}
