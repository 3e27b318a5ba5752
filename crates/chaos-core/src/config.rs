//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `chaos-config.yaml`. This module
//! defines strongly-typed structs that mirror the YAML structure, and a
//! loader that never fails the caller: a missing file is written out with
//! defaults, and an unreadable or invalid file falls back to defaults with
//! a warning.

use std::path::Path;

use chaos_types::{Deployment, Environment, JoinSettings};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file.
    #[error("failed to access config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse or render YAML content.
    #[error("failed to process config YAML: {source}")]
    Yaml {
        /// The underlying YAML error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosConfig {
    /// Scheduler timing and draw settings.
    #[serde(default)]
    pub chaos: ChaosSettings,

    /// Voting settings.
    #[serde(default)]
    pub voting: VotingConfig,

    /// Deployment facts used for eligibility.
    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Network listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ChaosConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Write this configuration as YAML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if rendering or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let yaml = serde_yml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Load configuration, recovering locally from every failure.
    ///
    /// A missing file is created with defaults. A file that cannot be read
    /// or parsed is left alone and defaults are used. Failures are logged,
    /// never returned. `CHAOS_PORT` overrides `server.port` in every case.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load_with_port_override(path, std::env::var("CHAOS_PORT").ok().as_deref())
    }

    /// [`Self::load_or_default`] with the port override passed explicitly.
    pub fn load_with_port_override(path: &Path, port_override: Option<&str>) -> Self {
        let mut config = Self::load_file_or_default(path);
        if let Some(value) = port_override {
            config.server.override_port(value);
        }
        config
    }

    fn load_file_or_default(path: &Path) -> Self {
        if !path.exists() {
            let config = Self::default();
            match config.save(path) {
                Ok(()) => info!(path = %path.display(), "Wrote default configuration"),
                Err(e) => warn!(path = %path.display(), error = %e, "Could not save default configuration"),
            }
            return config;
        }
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not load configuration, using defaults");
                Self::default()
            }
        }
    }

    /// The settings pushed to participants in `JoinConfirm`.
    pub const fn join_settings(&self) -> JoinSettings {
        JoinSettings {
            timer_duration: self.chaos.timer_duration,
            base_event_duration: self.chaos.base_event_duration,
            voting_enabled: self.voting.enabled,
        }
    }

    /// The eligibility environment described by this configuration.
    pub const fn environment(&self) -> Environment {
        Environment {
            deployment: self.environment.deployment,
            accessibility_restricted: self.environment.accessibility_mode,
        }
    }
}

/// Scheduler timing and draw settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosSettings {
    /// Base ticks between event selections.
    #[serde(default = "default_timer_duration")]
    pub timer_duration: u16,

    /// Default length of a timed event, in ticks.
    #[serde(default = "default_base_event_duration")]
    pub base_event_duration: u16,

    /// Maximum ticks added to or removed from each timer reset.
    #[serde(default)]
    pub timer_jitter: u16,

    /// How many of the most recent selections are excluded from the next
    /// draw.
    #[serde(default = "default_repeat_window")]
    pub repeat_window: usize,

    /// Seed for reproducible draws. Random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ChaosSettings {
    fn default() -> Self {
        Self {
            timer_duration: default_timer_duration(),
            base_event_duration: default_base_event_duration(),
            timer_jitter: 0,
            repeat_window: default_repeat_window(),
            seed: None,
        }
    }
}

/// Voting settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingConfig {
    /// Whether participants pick the next event by vote.
    #[serde(default)]
    pub enabled: bool,

    /// Number of candidates offered per poll.
    #[serde(default = "default_candidate_count")]
    pub candidate_count: usize,

    /// Ticks a poll stays open. Clamped to the timer.
    #[serde(default = "default_poll_window")]
    pub poll_window: u16,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            candidate_count: default_candidate_count(),
            poll_window: default_poll_window(),
        }
    }
}

/// Deployment facts used for eligibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Dedicated or integrated host.
    #[serde(default)]
    pub deployment: Deployment,

    /// Suppress motion and camera effects.
    #[serde(default)]
    pub accessibility_mode: bool,
}

/// Network listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port for participant and operator traffic.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Real-time milliseconds per host tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl ServerConfig {
    /// Replace the port with `value` when it parses as one.
    pub fn override_port(&mut self, value: &str) {
        match value.parse() {
            Ok(port) => self.port = port,
            Err(e) => warn!(value, error = %e, "Ignoring invalid CHAOS_PORT"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG`
    /// is unset.
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

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_timer_duration() -> u16 {
    900
}

const fn default_base_event_duration() -> u16 {
    600
}

const fn default_repeat_window() -> usize {
    3
}

const fn default_candidate_count() -> usize {
    4
}

const fn default_poll_window() -> u16 {
    700
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    7878
}

const fn default_tick_interval_ms() -> u64 {
    50
}

fn default_log_level() -> String {
    String::from("info")
}
