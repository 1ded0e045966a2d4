//! Process-wide shutdown context.
//!
//! This crate publishes a single cancellable [`ShutdownContext`] at startup
//! and cancels it when the process receives a termination signal, so any
//! subsystem can observe shutdown without installing its own handler.

pub mod config;
pub mod context;
pub mod errors;
pub mod logging;
pub mod registry;
pub mod signals;

// Re-exports for convenience.
pub use config::AppConfig;
pub use context::ShutdownContext;
pub use errors::{ConfigError, CoreError, ShutdownError};
pub use logging::LogVerbosity;
pub use registry::{context, setup_context, try_context, ContextRegistry};
pub use signals::{SignalWatcher, TerminationSignal};
