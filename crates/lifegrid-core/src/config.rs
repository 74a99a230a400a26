//! Configuration loading and typed config structures for the lifegrid server.
//!
//! The canonical configuration lives in `lifegrid-config.yaml` at the project
//! root. Every field has a default, so a missing file simply yields the
//! defaults. Environment variables are applied on top of whatever the file
//! provided; see [`LifegridConfig::apply_env_overrides`] for the list.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid {var}={value:?}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value found in the environment.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// The configuration parsed but a value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LifegridConfig {
    /// HTTP and websocket settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Simulation settings.
    #[serde(default)]
    pub game: GameConfig,

    /// Snapshot persistence settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LifegridConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment overrides are applied after parsing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::InvalidEnv`] if an override does not parse.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML or
    /// [`ConfigError::InvalidEnv`] if an override does not parse.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    /// Environment overrides apply either way, then the result is validated.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            Self::from_file(path)?
        } else {
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config
        };
        config.validate()?;
        Ok(config)
    }

    /// Override values with environment variables when set.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `HOST` | `server.host` |
    /// | `PORT` | `server.port` |
    /// | `WS_ENDPOINT` | `server.ws_path` |
    /// | `WS_ORIGIN_CHECK` | `server.origin_check` |
    /// | `MAX_IN_FLIGHT_COMMANDS` | `server.max_in_flight_commands` |
    /// | `COMMAND_TIMEOUT_MS` | `server.command_timeout_ms` |
    /// | `TICK_SPEED` | `game.tick_interval_ms` |
    /// | `MAX_OBSERVE_REGION_SIZE` | `game.max_observe_region_size` |
    /// | `SAVE_INTERVAL` | `persistence.save_interval_secs` |
    /// | `SAVE_DIR` | `persistence.save_dir` |
    /// | `MAX_SAVE_FILES` | `persistence.max_save_files` |
    /// | `LOG_LEVEL` | `logging.level` |
    /// | `LOG_FORMAT` | `logging.format` |
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for a value that does not parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary lookup, e.g. a map in tests.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for a value that does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("HOST") {
            self.server.host = val;
        }
        override_parsed(&lookup, "PORT", &mut self.server.port)?;
        if let Some(val) = lookup("WS_ENDPOINT") {
            self.server.ws_path = val;
        }
        override_parsed(&lookup, "WS_ORIGIN_CHECK", &mut self.server.origin_check)?;
        override_parsed(
            &lookup,
            "MAX_IN_FLIGHT_COMMANDS",
            &mut self.server.max_in_flight_commands,
        )?;
        override_parsed(&lookup, "COMMAND_TIMEOUT_MS", &mut self.server.command_timeout_ms)?;
        override_parsed(&lookup, "TICK_SPEED", &mut self.game.tick_interval_ms)?;
        override_parsed(
            &lookup,
            "MAX_OBSERVE_REGION_SIZE",
            &mut self.game.max_observe_region_size,
        )?;
        override_parsed(&lookup, "SAVE_INTERVAL", &mut self.persistence.save_interval_secs)?;
        if let Some(val) = lookup("SAVE_DIR") {
            self.persistence.save_dir = PathBuf::from(val);
        }
        override_parsed(&lookup, "MAX_SAVE_FILES", &mut self.persistence.max_save_files)?;
        if let Some(val) = lookup("LOG_LEVEL") {
            self.logging.level = val;
        }
        override_parsed(&lookup, "LOG_FORMAT", &mut self.logging.format)?;
        Ok(())
    }

    /// Reject values the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "game.tick_interval_ms must be greater than zero".to_owned(),
            ));
        }
        if self.server.max_in_flight_commands == 0 {
            return Err(ConfigError::Invalid(
                "server.max_in_flight_commands must be greater than zero".to_owned(),
            ));
        }
        if !self.server.ws_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.ws_path must start with '/', got {:?}",
                self.server.ws_path
            )));
        }
        if self.server.ws_path == "/health" {
            return Err(ConfigError::Invalid(
                "server.ws_path must not shadow /health".to_owned(),
            ));
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, var: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = lookup(var) {
        *target = value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
            var,
            value: value.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

/// HTTP and websocket settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path that accepts websocket upgrades.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Refuse upgrades whose `Origin` does not match `Host`.
    #[serde(default)]
    pub origin_check: bool,

    /// Commands a single connection may have running at once.
    #[serde(default = "default_max_in_flight_commands")]
    pub max_in_flight_commands: usize,

    /// Per-command handler deadline in milliseconds; 0 disables it.
    #[serde(default)]
    pub command_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            origin_check: false,
            max_in_flight_commands: default_max_in_flight_commands(),
            command_timeout_ms: 0,
        }
    }
}

/// Simulation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Milliseconds between generations.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Largest diagonal an observed region may have.
    #[serde(default = "default_max_observe_region_size")]
    pub max_observe_region_size: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_observe_region_size: default_max_observe_region_size(),
        }
    }
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Seconds between snapshots; zero or negative disables saving.
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: i64,

    /// Directory snapshot files are written to.
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,

    /// Snapshot files to keep; 0 keeps all of them.
    #[serde(default = "default_max_save_files")]
    pub max_save_files: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_interval_secs: default_save_interval_secs(),
            save_dir: default_save_dir(),
            max_save_files: default_max_save_files(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}, expected pretty or json")),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_ws_path() -> String {
    "/game".to_owned()
}

const fn default_max_in_flight_commands() -> usize {
    32
}

const fn default_tick_interval_ms() -> u64 {
    250
}

const fn default_max_observe_region_size() -> u32 {
    1000
}

const fn default_save_interval_secs() -> i64 {
    60
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("./saves")
}

const fn default_max_save_files() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_owned()
}
