//! Configuration for the playback coordinator
//!
//! Two layers:
//! 1. **Bootstrap** (`feedplay_common::config::TomlConfig`): locates the file
//!    and carries logging settings.
//! 2. **Coordinator** (`CoordinatorConfig`): the `[coordinator]` table of the
//!    same file, every field defaulted so an empty or missing file is valid.

use crate::error::{Error, Result};
use crate::host::AdaptiveSessionConfig;
use feedplay_common::config::{LoggingConfig, TomlConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Grace period between releasing a source and detaching the resource
///
/// Platform workaround: media pipelines finish releasing hardware decode
/// buffers asynchronously, and re-attaching the resource immediately after
/// release races with that. Removing this wait reintroduces audio from the
/// previous slot bleeding into the next one.
pub const DEFAULT_TEARDOWN_GRACE_MS: u64 = 100;

/// Coordinator runtime settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// See [`DEFAULT_TEARDOWN_GRACE_MS`]
    pub teardown_grace_ms: u64,

    /// Upper bound on waiting for the adaptive manifest-parsed signal
    pub manifest_timeout_ms: u64,

    /// Upper bound on waiting for readiness before applying `start_at`
    pub ready_timeout_ms: u64,

    /// When true, a queued activation overtaken by a newer request is dropped
    pub coalesce_activations: bool,

    /// Pause and mute everything when the host page becomes hidden
    pub pause_on_hidden: bool,

    /// Event bus channel capacity
    pub event_capacity: usize,

    /// Settings for adaptive-streaming sessions
    pub adaptive: AdaptiveSessionConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            teardown_grace_ms: DEFAULT_TEARDOWN_GRACE_MS,
            manifest_timeout_ms: 10_000,
            ready_timeout_ms: 5000,
            coalesce_activations: false,
            pause_on_hidden: true,
            event_capacity: 256,
            adaptive: AdaptiveSessionConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Deserialize from the raw `[coordinator]` table
    pub fn from_table(table: &toml::Table) -> Result<Self> {
        let config: Self = toml::Value::Table(table.clone())
            .try_into()
            .map_err(|e| Error::Config(format!("Invalid [coordinator] table: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the sequencer misbehave
    pub fn validate(&self) -> Result<()> {
        if self.manifest_timeout_ms == 0 {
            return Err(Error::Config(
                "manifest_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn teardown_grace(&self) -> Duration {
        Duration::from_millis(self.teardown_grace_ms)
    }

    pub fn manifest_timeout(&self) -> Duration {
        Duration::from_millis(self.manifest_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub coordinator: CoordinatorConfig,
}

impl Config {
    /// Resolve and load the bootstrap file, then the coordinator table
    ///
    /// Priority: CLI path > `FEEDPLAY_CONFIG` > user config dir > defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let toml_config = TomlConfig::load_or_default(cli_path)?;
        let coordinator = CoordinatorConfig::from_table(&toml_config.coordinator)?;
        info!(
            "Coordinator config: grace={}ms coalesce={} pause_on_hidden={}",
            coordinator.teardown_grace_ms,
            coordinator.coalesce_activations,
            coordinator.pause_on_hidden
        );
        Ok(Self {
            logging: toml_config.logging,
            coordinator,
        })
    }
}
