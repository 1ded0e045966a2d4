//! Tracing setup with a runtime-adjustable verbosity level.
//!
//! The global subscriber is a `tracing-subscriber` registry whose first layer
//! is a reloadable [`LevelFilter`]. [`LogVerbosity`] wraps the reload handle
//! so the shutdown path can make sure its own record is visible.

use std::str::FromStr;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, reload, Registry};

use crate::config::LoggingConfig;
use crate::errors::{ConfigError, ShutdownError};

/// Reload handle for the process-wide level filter.
pub type LevelHandle = reload::Handle<LevelFilter, Registry>;

/// Handle for adjusting the global log verbosity at runtime.
#[derive(Clone)]
pub struct LogVerbosity {
    handle: LevelHandle,
}

impl LogVerbosity {
    pub fn new(handle: LevelHandle) -> Self {
        Self { handle }
    }

    /// The level currently in effect, or `None` if the subscriber is gone.
    pub fn current(&self) -> Option<LevelFilter> {
        self.handle.clone_current()
    }

    /// Make sure records at `level` are emitted.
    ///
    /// Verbosity only ever goes up: a filter that is already more verbose
    /// than `level` is left alone. Returns the level in effect afterwards.
    pub fn raise_to(&self, level: LevelFilter) -> Result<LevelFilter, ShutdownError> {
        let mut active = level;
        self.handle
            .modify(|filter| {
                if *filter < level {
                    *filter = level;
                }
                active = *filter;
            })
            .map_err(|e| ShutdownError::Verbosity(e.to_string()))?;
        Ok(active)
    }
}

/// Parse a level name (`trace`, `debug`, `info`, `warn`, `error`, `off`).
pub fn parse_level(level: &str) -> Result<LevelFilter, ConfigError> {
    LevelFilter::from_str(level.trim()).map_err(|_| ConfigError::InvalidValue {
        field: "logging.level".into(),
        detail: format!("unknown log level '{level}'"),
    })
}

/// Install the global tracing subscriber and return its verbosity handle.
pub fn init_tracing(config: &LoggingConfig) -> Result<LogVerbosity, ConfigError> {
    let level = parse_level(&config.level)?;
    let (filter, handle) = reload::Layer::new(level);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(config.ansi),
        )
        .init();

    Ok(LogVerbosity::new(handle))
}


#[cfg(test)]
mod tests {
    use super::capture::capturing_dispatch;
    use super::*;
    use tracing::{info, warn};

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info").unwrap(), LevelFilter::INFO);
        assert_eq!(parse_level("WARN").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_level(" off ").unwrap(), LevelFilter::OFF);

        let err = parse_level("loud").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "logging.level"));
    }

    #[test]
    fn test_raise_increases_verbosity() {
        let (_dispatch, verbosity, _events) = capturing_dispatch(LevelFilter::WARN);
        assert_eq!(verbosity.current(), Some(LevelFilter::WARN));

        assert_eq!(verbosity.raise_to(LevelFilter::INFO).unwrap(), LevelFilter::INFO);
        assert_eq!(verbosity.current(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_raise_never_lowers_verbosity() {
        let (_dispatch, verbosity, _events) = capturing_dispatch(LevelFilter::DEBUG);

        assert_eq!(verbosity.raise_to(LevelFilter::INFO).unwrap(), LevelFilter::DEBUG);
        assert_eq!(verbosity.current(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_raise_from_off() {
        let (_dispatch, verbosity, _events) = capturing_dispatch(LevelFilter::OFF);
        verbosity.raise_to(LevelFilter::INFO).unwrap();
        assert_eq!(verbosity.current(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_raise_fails_when_subscriber_dropped() {
        let (dispatch, verbosity, _events) = capturing_dispatch(LevelFilter::WARN);
        drop(dispatch);

        let err = verbosity.raise_to(LevelFilter::INFO).unwrap_err();
        assert!(matches!(err, ShutdownError::Verbosity(_)));
    }

    #[test]
    fn test_raised_level_lets_info_records_through() {
        let (dispatch, verbosity, events) = capturing_dispatch(LevelFilter::WARN);
        let _guard = tracing::dispatcher::set_default(&dispatch);

        info!("before raise");
        warn!("warning");
        verbosity.raise_to(LevelFilter::INFO).unwrap();
        info!("after raise");

        let messages: Vec<String> = events.all().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["warning".to_string(), "after raise".to_string()]);
    }
}
