//! Signal watcher for process termination notifications.
//!
//! The watcher owns a single callback slot and a broadcast channel. The first
//! termination notification, whether from the OS or simulated through
//! [`SignalWatcher::notify`], is published on the channel and runs the
//! callback. Later notifications are ignored. The watcher never terminates
//! the process itself.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::errors::ShutdownError;

/// A termination request from the operating environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationSignal {
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGQUIT.
    Quit,
    /// SIGHUP.
    Hangup,
    /// Delivered programmatically rather than by the OS.
    Simulated,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminationSignal::Interrupt => "SIGINT",
            TerminationSignal::Terminate => "SIGTERM",
            TerminationSignal::Quit => "SIGQUIT",
            TerminationSignal::Hangup => "SIGHUP",
            TerminationSignal::Simulated => "simulated",
        };
        f.write_str(name)
    }
}

/// Callback invoked once when the first termination notification arrives.
pub type ShutdownCallback =
    Box<dyn FnOnce(TerminationSignal) -> anyhow::Result<()> + Send + 'static>;

struct Shared {
    callback: Mutex<Option<ShutdownCallback>>,
    fired: watch::Sender<Option<TerminationSignal>>,
}

/// Subscription to termination notifications with a single callback.
#[derive(Clone)]
pub struct SignalWatcher {
    shared: Arc<Shared>,
}

impl SignalWatcher {
    pub fn new() -> Self {
        let (fired, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                callback: Mutex::new(None),
                fired,
            }),
        }
    }

    /// Register the callback, replacing any previously registered one.
    ///
    /// If a notification was already delivered the callback runs right away,
    /// so a late registration never misses the shutdown.
    pub fn register_callback<F>(&self, callback: F)
    where
        F: FnOnce(TerminationSignal) -> anyhow::Result<()> + Send + 'static,
    {
        let mut slot = self.lock_callback();
        let fired = *self.shared.fired.borrow();
        if let Some(signal) = fired {
            drop(slot);
            debug!(%signal, "callback registered after notification, running it now");
            run_callback(Box::new(callback), signal);
            return;
        }
        if slot.replace(Box::new(callback)).is_some() {
            debug!("replaced previously registered shutdown callback");
        }
    }

    /// Deliver a termination notification.
    ///
    /// Returns `true` for the first delivery, which runs the callback, and
    /// `false` for every later one.
    pub fn notify(&self, signal: TerminationSignal) -> bool {
        let mut slot = self.lock_callback();
        let first = self.shared.fired.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(signal);
            true
        });
        if !first {
            debug!(%signal, "ignoring repeated termination notification");
            return false;
        }
        let callback = slot.take();
        drop(slot);

        match callback {
            Some(callback) => run_callback(callback, signal),
            None => warn!(%signal, "termination notification with no callback registered"),
        }
        true
    }

    /// Receiver that observes the first delivered notification.
    pub fn subscribe(&self) -> watch::Receiver<Option<TerminationSignal>> {
        self.shared.fired.subscribe()
    }

    /// The signal that fired, if any.
    pub fn fired(&self) -> Option<TerminationSignal> {
        *self.shared.fired.borrow()
    }

    /// Install OS handlers for `kinds` and spawn a task that forwards the
    /// first one received to [`notify`](Self::notify).
    ///
    /// Handlers are installed before this returns, so a registration failure
    /// is reported here. Must be called from within a Tokio runtime.
    pub fn listen(&self, kinds: &[TerminationSignal]) -> Result<JoinHandle<()>, ShutdownError> {
        let mut waiters = JoinSet::new();
        for &kind in kinds {
            install(&mut waiters, kind)?;
        }

        if waiters.is_empty() {
            warn!("no termination signals are being watched");
        } else {
            info!(signals = ?kinds, "watching for termination signals");
        }

        let watcher = self.clone();
        Ok(tokio::spawn(async move {
            if let Some(Ok(signal)) = waiters.join_next().await {
                info!(%signal, "received termination signal");
                watcher.notify(signal);
            }
        }))
    }

    fn lock_callback(&self) -> MutexGuard<'_, Option<ShutdownCallback>> {
        self.shared
            .callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SignalWatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn run_callback(callback: ShutdownCallback, signal: TerminationSignal) {
    if let Err(e) = callback(signal) {
        error!(%signal, error = %e, "shutdown callback failed");
    }
}

#[cfg(unix)]
fn install(
    waiters: &mut JoinSet<TerminationSignal>,
    kind: TerminationSignal,
) -> Result<(), ShutdownError> {
    use tokio::signal::unix::{signal, SignalKind};

    let signal_kind = match kind {
        TerminationSignal::Interrupt => SignalKind::interrupt(),
        TerminationSignal::Terminate => SignalKind::terminate(),
        TerminationSignal::Quit => SignalKind::quit(),
        TerminationSignal::Hangup => SignalKind::hangup(),
        TerminationSignal::Simulated => {
            warn!("'simulated' is not an OS signal, skipping");
            return Ok(());
        }
    };

    let mut stream = signal(signal_kind).map_err(|source| ShutdownError::SignalRegistration {
        signal: kind,
        source,
    })?;
    waiters.spawn(async move {
        stream.recv().await;
        kind
    });
    Ok(())
}

#[cfg(not(unix))]
fn install(
    waiters: &mut JoinSet<TerminationSignal>,
    kind: TerminationSignal,
) -> Result<(), ShutdownError> {
    if kind != TerminationSignal::Interrupt {
        warn!(signal = %kind, "only Ctrl+C is available on this platform, skipping");
        return Ok(());
    }
    waiters.spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        kind
    });
    Ok(())
}
