//! Error types for the shutdown context library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;
use uuid::Uuid;

use crate::signals::TerminationSignal;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Shutdown errors
// ---------------------------------------------------------------------------

/// Errors from publishing, retrieving, or wiring the shutdown context.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The context was requested before startup published it.
    #[error("shutdown context requested before it was initialized")]
    NotInitialized,

    /// A second initialization was attempted; the first context stays published.
    #[error("shutdown context already initialized (context {context_id})")]
    AlreadyInitialized { context_id: Uuid },

    /// An OS signal handler could not be installed.
    #[error("failed to register {signal} handler: {source}")]
    SignalRegistration {
        signal: TerminationSignal,
        #[source]
        source: std::io::Error,
    },

    /// The logging verbosity could not be changed.
    #[error("failed to adjust log verbosity: {0}")]
    Verbosity(String),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = ShutdownError::NotInitialized;
        assert_eq!(
            err.to_string(),
            "shutdown context requested before it was initialized"
        );

        let id = Uuid::new_v4();
        let err = ShutdownError::AlreadyInitialized { context_id: id };
        assert!(err.to_string().contains(&id.to_string()));

        let err = ShutdownError::SignalRegistration {
            signal: TerminationSignal::Terminate,
            source: std::io::Error::other("boom"),
        };
        assert_eq!(err.to_string(), "failed to register SIGTERM handler: boom");

        let err = ConfigError::InvalidValue {
            field: "logging.level".into(),
            detail: "unknown level".into(),
        };
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let core_err: CoreError = ShutdownError::NotInitialized.into();
        assert!(matches!(core_err, CoreError::Shutdown(_)));

        let core_err: CoreError = ConfigError::FileNotFound("/nope".into()).into();
        assert!(matches!(core_err, CoreError::Config(_)));
    }
}
