//! Configuration management for jira-cli.
//!
//! Settings are read from an optional TOML file in the user's config
//! directory. Credentials are never stored here; they live in the OS keyring
//! or the environment.

mod settings;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use settings::Settings;

/// Directory name under the platform config directory.
const CONFIG_DIR_NAME: &str = "jira-cli";

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine the configuration directory")]
    NoConfigDir,

    /// The config file exists but could not be read.
    #[error("failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The config file is not valid TOML for [`Config`].
    #[error("failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The config file parsed but holds invalid values.
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    /// Load the configuration from the default location.
    ///
    /// A missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load the configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.settings.validate()?;

        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }
}

/// Path of the configuration file.
pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::tempdir;

    use super::*;
    use crate::api::Scope;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[settings]\ndefault_project = \"OPS\"\npage_size = 25\ndefault_scope = \"mine-assigned\""
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.settings.default_project.as_deref(), Some("OPS"));
        assert_eq!(config.settings.page_size, 25);
        assert_eq!(config.settings.default_scope, Scope::MineAssigned);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[settings\npage_size = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_out_of_range_page_size_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[settings]\npage_size = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_config_path_ends_with_file_name() {
        if let Ok(path) = config_path() {
            assert!(path.ends_with("jira-cli/config.toml"));
        }
    }
}
