use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::platform;

/// Client ID compiled into the binary (empty when not provided at build time)
pub const BUILD_CLIENT_ID: &str = match option_env!("AUTHLEIBER_CLIENT_ID") {
    Some(id) => id,
    None => "",
};

/// Client secret compiled into the binary (empty when not provided at build time)
pub const BUILD_CLIENT_SECRET: &str = match option_env!("AUTHLEIBER_CLIENT_SECRET") {
    Some(secret) => secret,
    None => "",
};

pub const DEFAULT_REDIRECT_SCHEME: &str = "authleiber";

pub const DEFAULT_CALLBACK_PORT: u16 = 53134;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord: DiscordConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Redirect scheme identifier, used as the callback path
    pub redirect_scheme: String,
    pub callback_port: u16,
    pub scopes: Vec<String>,
}

impl DiscordConfig {
    /// Both halves of the client credentials are present
    pub fn has_credentials(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            client_id: BUILD_CLIENT_ID.to_string(),
            client_secret: BUILD_CLIENT_SECRET.to_string(),
            redirect_scheme: DEFAULT_REDIRECT_SCHEME.to_string(),
            callback_port: DEFAULT_CALLBACK_PORT,
            scopes: vec!["identify".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StoreBackend,
    /// Overrides the session file location for the file backend
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Loads the config from the platform location, or defaults when absent
    pub fn load() -> Result<Self, ConfigError> {
        match platform::get_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }
}
