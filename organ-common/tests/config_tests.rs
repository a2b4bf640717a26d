//! Tests for config file resolution and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate ORGAN_PLAY_CONFIG are marked with #[serial].

use organ_common::config::{ConfigResolver, TomlConfig, CONFIG_ENV_VAR};
use organ_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_cli_path_takes_priority_over_env() {
    let dir = TempDir::new().unwrap();
    let cli = write_config(&dir, "cli.toml", "[logging]\nlevel = \"debug\"\n");
    let from_env = write_config(&dir, "env.toml", "[logging]\nlevel = \"trace\"\n");

    env::set_var(CONFIG_ENV_VAR, &from_env);

    let resolver = ConfigResolver::new("organ-play-test");
    assert_eq!(resolver.config_path(Some(&cli)), Some(cli.clone()));

    let config = resolver.load(Some(&cli)).unwrap();
    assert_eq!(config.logging.level, "debug");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_arg() {
    let dir = TempDir::new().unwrap();
    let from_env = write_config(
        &dir,
        "env.toml",
        "[playback]\ndisplay_warnings = true\nheartbeat_interval_ms = 25\n",
    );

    env::set_var(CONFIG_ENV_VAR, &from_env);

    let resolver = ConfigResolver::new("organ-play-test");
    let config = resolver.load(None).unwrap();

    assert!(config.playback.display_warnings);
    assert_eq!(config.playback.heartbeat_interval_ms, 25);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_explicit_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let resolver = ConfigResolver::new("organ-play-test");
    let config = resolver.load(Some(&missing)).unwrap();

    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_no_config_anywhere_uses_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    // A module name that definitely won't have a config file
    let resolver = ConfigResolver::new("nonexistent-organ-module-12345");
    assert!(resolver.config_path(None).is_none());

    let config = resolver.load(None).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    env::remove_var(CONFIG_ENV_VAR);

    let dir = TempDir::new().unwrap();
    let broken = write_config(&dir, "broken.toml", "[playback\nverbose = yes");

    let resolver = ConfigResolver::new("organ-play-test");
    let result = resolver.load(Some(&broken));

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_invalid_value_reports_file_name() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "rate.toml", "[playback]\nprelude_speed = 0.0\n");

    let err = TomlConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("rate.toml"));
}
