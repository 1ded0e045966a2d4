//! Heartbeat worker that runs until the shutdown context is cancelled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tracing::{debug, info};

use shutdownctx_core::ShutdownContext;

/// Counters shared with the startup routine.
#[derive(Default)]
pub struct WorkerStats {
    pub heartbeats: AtomicU64,
}

/// Periodic liveness logger.
///
/// The worker holds no shutdown plumbing of its own; it retrieves the
/// process-wide context and stops when that context is cancelled.
pub struct HeartbeatWorker {
    interval: Duration,
    stats: Arc<WorkerStats>,
}

impl HeartbeatWorker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stats: Arc::new(WorkerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        self.stats.clone()
    }

    /// Run against the process-wide shutdown context.
    pub async fn run(&self) {
        self.run_until(shutdownctx_core::context()).await;
    }

    /// Run until `ctx` is cancelled.
    pub async fn run_until(&self, ctx: ShutdownContext) {
        info!(
            interval_secs = self.interval.as_secs(),
            context_id = %ctx.id(),
            "heartbeat worker started"
        );

        let mut interval = time::interval(self.interval);
        // The first tick fires immediately.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!(
                        heartbeats = self.stats.heartbeats.load(Ordering::SeqCst),
                        "shutdown requested, heartbeat worker stopping"
                    );
                    break;
                }
                _ = interval.tick() => {
                    let beat = self.stats.heartbeats.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!(beat, "heartbeat");
                }
            }
        }
    }
}
