//! TOML-based configuration for processes that publish a shutdown context.
//!
//! Every section is optional. A missing file path means all defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::logging::parse_level;
use crate::signals::TerminationSignal;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tracing output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Which termination signals cancel the shutdown context.
    #[serde(default)]
    pub signals: SignalsConfig,

    /// Heartbeat worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Starting level: trace, debug, info, warn, error, off.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit ANSI colour codes.
    #[serde(default = "default_true")]
    pub ansi: bool,
}

fn default_log_level() -> String {
    "warn".into()
}
fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            ansi: default_true(),
        }
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Termination signals that trigger shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalsConfig {
    #[serde(default = "default_watched_signals")]
    pub watch: Vec<TerminationSignal>,
}

fn default_watched_signals() -> Vec<TerminationSignal> {
    vec![TerminationSignal::Interrupt, TerminationSignal::Terminate]
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            watch: default_watched_signals(),
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Heartbeat worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Seconds between heartbeats (default 30).
    #[serde(default = "default_heartbeat")]
    pub heartbeat_secs: u64,
}

fn default_heartbeat() -> u64 {
    30
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_level(&self.logging.level)?;

        if self.signals.watch.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "signals.watch".into(),
                detail: "at least one termination signal must be watched".into(),
            });
        }
        if self.signals.watch.contains(&TerminationSignal::Simulated) {
            return Err(ConfigError::InvalidValue {
                field: "signals.watch".into(),
                detail: "'simulated' is not an OS signal".into(),
            });
        }
        if self.worker.heartbeat_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker.heartbeat_secs".into(),
                detail: "heartbeat interval must be > 0".into(),
            });
        }

        Ok(())
    }

    /// Load from `path` if given, otherwise use defaults, then validate.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }
}
