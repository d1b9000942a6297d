//! Full configuration load: bootstrap file plus `[coordinator]` table
//!
//! Marked #[serial] because resolution reads FEEDPLAY_CONFIG.

use feedplay_common::config::CONFIG_ENV_VAR;
use feedplay_vp::config::{Config, CoordinatorConfig};
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_load_coordinator_table() {
    let file = write_config(
        r#"
        [logging]
        level = "debug"

        [coordinator]
        teardown_grace_ms = 250
        coalesce_activations = true

        [coordinator.adaptive]
        back_buffer_length_secs = 10
        "#,
    );

    let config = Config::load(Some(file.path())).unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.coordinator.teardown_grace_ms, 250);
    assert!(config.coordinator.coalesce_activations);
    assert_eq!(config.coordinator.adaptive.back_buffer_length_secs, 10);
    assert!(config.coordinator.adaptive.enable_worker);
    assert_eq!(config.coordinator.ready_timeout_ms, 5000);
}

#[test]
#[serial]
fn test_env_path_used_when_no_cli_path() {
    let file = write_config("[coordinator]\npause_on_hidden = false\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    let config = Config::load(None).unwrap();
    assert!(!config.coordinator.pause_on_hidden);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_gives_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let missing = std::path::PathBuf::from("/nonexistent/feedplay/config.toml");

    let config = Config::load(Some(&missing)).unwrap();
    assert_eq!(config.coordinator, CoordinatorConfig::default());
}

#[test]
#[serial]
fn test_zero_manifest_timeout_rejected() {
    let file = write_config("[coordinator]\nmanifest_timeout_ms = 0\n");

    assert!(Config::load(Some(file.path())).is_err());
}
