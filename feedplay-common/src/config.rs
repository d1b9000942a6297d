//! Bootstrap configuration loading
//!
//! The bootstrap file is located with this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `FEEDPLAY_CONFIG` environment variable
//! 3. `<user config dir>/feedplay/config.toml`
//! 4. Built-in defaults (no file)
//!
//! A missing file is not an error: a warning is logged and defaults are used.
//! A file that exists but cannot be parsed is reported as `Error::Config`.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "FEEDPLAY_CONFIG";

/// Bootstrap configuration loaded from TOML
///
/// The `coordinator` table is kept raw here; the player crate deserializes it
/// into its own typed settings so this crate stays independent of them.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Coordinator settings table (optional)
    #[serde(default)]
    pub coordinator: toml::Table,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded TOML configuration from {:?}", path);
        Ok(config)
    }

    /// Resolve the config file and load it, falling back to defaults when absent
    pub fn load_or_default(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg) {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                warn!("Config file {:?} not found, using built-in defaults", path);
                Ok(Self::default())
            }
            None => {
                info!("No config file located, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Resolve the config file path by priority (CLI > env > user config dir)
///
/// The user config dir candidate is only returned if the file exists there;
/// explicit CLI/env paths are returned as given so a typo is reported.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Platform default location: `<config dir>/feedplay/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("feedplay").join("config.toml"))
}
