//! Publication of the process shutdown context.
//!
//! A [`ContextRegistry`] holds at most one [`ShutdownContext`] in a write-once
//! slot. Startup calls [`ContextRegistry::initialize`], which binds the
//! context to a [`SignalWatcher`]; any subsystem can then retrieve the same
//! instance. The process-wide registry is reached through [`setup_context`],
//! [`context`] and [`try_context`].

use std::sync::OnceLock;

use tracing::{debug, info};
use tracing_subscriber::filter::LevelFilter;

use crate::context::ShutdownContext;
use crate::errors::ShutdownError;
use crate::logging::LogVerbosity;
use crate::signals::SignalWatcher;

static GLOBAL: ContextRegistry = ContextRegistry::new();

/// Write-once home of the shutdown context.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    slot: OnceLock<ShutdownContext>,
}

impl ContextRegistry {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static ContextRegistry {
        &GLOBAL
    }

    /// Create the shutdown context, bind it to `watcher`, and publish it.
    ///
    /// When the watcher fires, the registered callback raises `verbosity` to
    /// at least INFO, logs `caught application stop signal` with the
    /// context id, and cancels the context.
    ///
    /// A second call fails with [`ShutdownError::AlreadyInitialized`] and
    /// leaves the first context and its callback in place.
    pub fn initialize(
        &self,
        watcher: &SignalWatcher,
        verbosity: &LogVerbosity,
    ) -> Result<ShutdownContext, ShutdownError> {
        let ctx = ShutdownContext::new();
        if let Err(rejected) = self.slot.set(ctx.clone()) {
            let context_id = self.slot.get().map_or(rejected.id(), ShutdownContext::id);
            return Err(ShutdownError::AlreadyInitialized { context_id });
        }

        let callback_ctx = ctx.clone();
        let verbosity = verbosity.clone();
        watcher.register_callback(move |signal| {
            let raised = verbosity.raise_to(LevelFilter::INFO);
            info!(
                context_id = %callback_ctx.id(),
                %signal,
                "caught application stop signal"
            );
            callback_ctx.cancel();
            raised?;
            Ok(())
        });

        debug!(context_id = %ctx.id(), "shutdown context published");
        Ok(ctx)
    }

    /// The published context.
    ///
    /// Fails with [`ShutdownError::NotInitialized`] before
    /// [`initialize`](Self::initialize) has run.
    pub fn retrieve(&self) -> Result<ShutdownContext, ShutdownError> {
        self.slot.get().cloned().ok_or(ShutdownError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.get().is_some()
    }
}

/// Initialize the process-wide shutdown context. Call once during startup,
/// before spawning anything that calls [`context`].
pub fn setup_context(
    watcher: &SignalWatcher,
    verbosity: &LogVerbosity,
) -> Result<ShutdownContext, ShutdownError> {
    GLOBAL.initialize(watcher, verbosity)
}

/// The process-wide shutdown context, or [`ShutdownError::NotInitialized`].
pub fn try_context() -> Result<ShutdownContext, ShutdownError> {
    GLOBAL.retrieve()
}

/// The process-wide shutdown context.
///
/// # Panics
///
/// Panics if [`setup_context`] has not run yet. That is a startup ordering
/// bug, not a runtime condition.
pub fn context() -> ShutdownContext {
    match GLOBAL.retrieve() {
        Ok(ctx) => ctx,
        Err(e) => panic!("{e}: setup_context() must run during startup before context() is used"),
    }
}
