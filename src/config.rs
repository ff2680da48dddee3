//! Persisted application configuration.
//!
//! Settings live in a TOML file under the `.dronewatch` root: the portal
//! base URL and the operator identity shown in the page header. The identity
//! values are display-only; either may be absent.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Fallback shown when neither a name nor an email is configured.
pub const PLACEHOLDER_EMAIL: &str = "user@example.com";

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

/// Connection settings for the detection portal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortalSettings {
    /// Base URL the endpoint clients resolve against.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Operator identity used only for greeting text and the header badge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OperatorIdentity {
    /// Display name, if the operator set one.
    #[serde(default)]
    pub name: Option<String>,
    /// Email address, if the operator set one.
    #[serde(default)]
    pub email: Option<String>,
}

impl OperatorIdentity {
    /// Preferred display string: name, then email, then a placeholder.
    pub fn display(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.email.as_deref())
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(PLACEHOLDER_EMAIL)
    }
}

/// Aggregate application settings stored in the TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Portal connection settings.
    #[serde(default)]
    pub portal: PortalSettings,
    /// Operator identity for greeting text.
    #[serde(default)]
    pub operator: OperatorIdentity,
}

/// Errors raised while loading or saving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The application directory could not be resolved or created.
    #[error(transparent)]
    AppDir(#[from] app_dirs::AppDirError),
    /// Reading the config file failed.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The config file is not valid TOML for the expected layout.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// Serializing the settings to TOML failed.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Writing the config file failed.
    #[error("Failed to write config file {path}: {source}")]
    Write {
        /// File that failed to write.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir()?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from disk, returning defaults if the file is missing.
pub fn load_or_default() -> Result<AppConfig, ConfigError> {
    let path = config_path()?;
    load_from_path(&path)
}

/// Load configuration from a specific path, returning defaults if missing.
pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Save configuration to a specific path, creating parent directories as needed.
pub fn save_to_path(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string_pretty(config)?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
