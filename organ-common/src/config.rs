//! Configuration loading and config file resolution
//!
//! Bootstrap configuration is a small TOML file. It is resolved in this
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`ORGAN_PLAY_CONFIG`)
//! 3. User config file (`~/.config/organ-play/config.toml` on Linux)
//! 4. System config file (`/etc/organ-play/config.toml`)
//! 5. Compiled defaults (fallback)
//!
//! A missing config file is never fatal: the resolver logs a warning and
//! falls back to compiled defaults. A config file that exists but cannot be
//! parsed is an error, so typos are not silently ignored.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ORGAN_PLAY_CONFIG";

/// Default speed decrement applied per heartbeat while a ritardando is active
pub const DEFAULT_RITARDANDO_DECREMENT: f32 = 0.002;

/// Default interval between engine heartbeats
///
/// Together with [`DEFAULT_RITARDANDO_DECREMENT`] this sets the pace of a
/// ritardando: 0.02 of speed per second of playing time.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 100;

/// Default prelude/postlude speed (90% of the hymn's tempo)
pub const DEFAULT_PRELUDE_SPEED: f32 = 0.9;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Operator playback preferences (optional)
    #[serde(default)]
    pub playback: PlaybackSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Operator playback preferences
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlaybackSettings {
    /// Show non-fatal musical warnings (e.g. stuck-note risk)
    #[serde(default)]
    pub display_warnings: bool,

    /// Log every outgoing event at info level
    #[serde(default)]
    pub verbose: bool,

    /// Speed decrement per heartbeat during a ritardando
    #[serde(default = "default_ritardando_decrement")]
    pub ritardando_decrement: f32,

    /// Heartbeat interval of the playback engine
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Speed used by a bare `--prelude` flag
    #[serde(default = "default_prelude_speed")]
    pub prelude_speed: f32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ritardando_decrement() -> f32 {
    DEFAULT_RITARDANDO_DECREMENT
}

fn default_heartbeat_interval_ms() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}

fn default_prelude_speed() -> f32 {
    DEFAULT_PRELUDE_SPEED
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            display_warnings: false,
            verbose: false,
            ritardando_decrement: DEFAULT_RITARDANDO_DECREMENT,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            prelude_speed: DEFAULT_PRELUDE_SPEED,
        }
    }
}

impl TomlConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Reject values the player cannot run with
    pub fn validate(&self) -> Result<()> {
        self.playback.validate()
    }
}

impl PlaybackSettings {
    /// Check option values before they reach the engine
    pub fn validate(&self) -> Result<()> {
        if !self.ritardando_decrement.is_finite() || self.ritardando_decrement < 0.0 {
            return Err(Error::InvalidInput(format!(
                "ritardando_decrement must be a non-negative number, got {}",
                self.ritardando_decrement
            )));
        }

        if self.heartbeat_interval_ms == 0 {
            return Err(Error::InvalidInput(
                "heartbeat_interval_ms must be greater than zero".to_string(),
            ));
        }

        if !self.prelude_speed.is_finite() || self.prelude_speed <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "prelude_speed must be positive, got {}",
                self.prelude_speed
            )));
        }

        Ok(())
    }
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    /// Per-user config file location, if the platform has one
    pub user_config_file: Option<PathBuf>,
    /// System-wide config file location
    pub system_config_file: PathBuf,
}

impl CompiledDefaults {
    /// Defaults for a named module (config lives under `<config_dir>/<module>/`)
    pub fn for_module(module_name: &str) -> Self {
        let user_config_file = dirs::config_dir().map(|d| d.join(module_name).join("config.toml"));

        let system_config_file = if cfg!(target_os = "windows") {
            PathBuf::from("C:\\ProgramData")
                .join(module_name)
                .join("config.toml")
        } else {
            PathBuf::from("/etc").join(module_name).join("config.toml")
        };

        Self {
            user_config_file,
            system_config_file,
        }
    }
}

/// Resolves and loads the bootstrap config file
pub struct ConfigResolver {
    defaults: CompiledDefaults,
}

impl ConfigResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            defaults: CompiledDefaults::for_module(module_name),
        }
    }

    /// Pick the config file to read, following the priority order
    ///
    /// Returns `None` when no candidate exists on disk; an explicit path
    /// (CLI or environment) is returned even if missing so the caller can
    /// report it.
    pub fn config_path(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        if let Some(user) = &self.defaults.user_config_file {
            if user.exists() {
                return Some(user.clone());
            }
        }

        if self.defaults.system_config_file.exists() {
            return Some(self.defaults.system_config_file.clone());
        }

        None
    }

    /// Load the resolved config, degrading to defaults when the file is missing
    pub fn load(&self, cli_arg: Option<&Path>) -> Result<TomlConfig> {
        let Some(path) = self.config_path(cli_arg) else {
            debug!("No config file found, using compiled defaults");
            return Ok(TomlConfig::default());
        };

        if !path.exists() {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            return Ok(TomlConfig::default());
        }

        let config = TomlConfig::load(&path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}
