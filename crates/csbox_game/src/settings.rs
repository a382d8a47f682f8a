//! Runtime settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings from {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid log level '{0}'")]
    LogLevel(String),
}

/// Which half of the game this scripting layer is loaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Server,
    Client,
}

impl Side {
    pub fn is_server(self) -> bool {
        self == Side::Server
    }

    pub fn is_client(self) -> bool {
        self == Side::Client
    }
}

/// Scripting layer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub side: Side,
    pub start_map: String,
    pub log_level: String,
    /// Clients the runtime connects during its simulated level.
    pub example_clients: u32,
    pub game_rules: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            side: Side::Server,
            start_map: "dm_lockdown".to_string(),
            log_level: "info".to_string(),
            example_clients: 2,
            game_rules: Some("CustomGameRules".to_string()),
        }
    }
}

impl Settings {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn log_level(&self) -> Result<tracing::Level, SettingsError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|_| SettingsError::LogLevel(self.log_level.clone()))
    }
}
