//! Shutdown context daemon entry point.
//!
//! Loads configuration, initializes logging, publishes the process-wide
//! shutdown context, starts a heartbeat worker, and exits once a termination
//! signal cancels the context.

mod worker;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use shutdownctx_core::config::AppConfig;
use shutdownctx_core::logging;
use shutdownctx_core::{setup_context, SignalWatcher};

use crate::worker::HeartbeatWorker;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Daemon that publishes a shutdown context tied to termination signals.
#[derive(Parser, Debug)]
#[command(name = "shutdownctx-daemon", version, about)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the starting log level (trace, debug, info, warn, error, off).
    #[arg(long)]
    log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
        config
            .validate()
            .context("configuration validation failed")?;
    }

    let verbosity =
        logging::init_tracing(&config.logging).context("failed to initialize logging")?;

    info!("shutdownctx daemon v{}", env!("CARGO_PKG_VERSION"));
    info!(
        level = %config.logging.level,
        signals = ?config.signals.watch,
        heartbeat_secs = config.worker.heartbeat_secs,
        "configuration loaded"
    );

    // The context must be published before anything that retrieves it starts.
    let watcher = SignalWatcher::new();
    let ctx = setup_context(&watcher, &verbosity)
        .context("failed to initialize shutdown context")?;
    let listener = watcher
        .listen(&config.signals.watch)
        .context("failed to register termination signal handlers")?;

    let worker = HeartbeatWorker::new(Duration::from_secs(config.worker.heartbeat_secs));
    let stats = worker.stats();
    let worker_handle = tokio::spawn(async move {
        worker.run().await;
    });

    ctx.cancelled().await;
    info!(context_id = %ctx.id(), "shutdown context cancelled, stopping...");

    match tokio::time::timeout(Duration::from_secs(10), worker_handle).await {
        Ok(Ok(())) => info!("heartbeat worker stopped gracefully"),
        Ok(Err(e)) => warn!("heartbeat worker task error: {}", e),
        Err(_) => warn!("heartbeat worker did not stop within 10s, forcing shutdown"),
    }

    listener.abort();

    info!(
        heartbeats = stats.heartbeats.load(std::sync::atomic::Ordering::SeqCst),
        "shutdownctx daemon stopped"
    );
    Ok(())
}
