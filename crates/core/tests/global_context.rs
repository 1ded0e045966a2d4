//! Integration test for the process-wide shutdown context.
//!
//! The global slot can only be written once per process, so the whole
//! lifecycle runs as a single ordered test.

use std::time::Duration;

use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{prelude::*, reload};

use shutdownctx_core::registry::ContextRegistry;
use shutdownctx_core::{
    context, setup_context, try_context, LogVerbosity, ShutdownError, SignalWatcher,
    TerminationSignal,
};

#[tokio::test]
async fn test_global_context_lifecycle() {
    let (filter, handle) = reload::Layer::new(LevelFilter::ERROR);
    let dispatch = Dispatch::new(tracing_subscriber::registry().with(filter));
    let verbosity = LogVerbosity::new(handle);

    // Before startup: retrieval is a precondition violation.
    assert!(!ContextRegistry::global().is_initialized());
    assert!(matches!(try_context(), Err(ShutdownError::NotInitialized)));
    assert!(std::panic::catch_unwind(context).is_err());

    // Startup.
    let watcher = SignalWatcher::new();
    let published = setup_context(&watcher, &verbosity).unwrap();
    assert!(ContextRegistry::global().is_initialized());

    // Running until notified.
    let early = context();
    assert!(early.same_instance(&published));
    assert!(!early.is_cancelled());

    // A second startup does not replace the published context.
    let err = setup_context(&SignalWatcher::new(), &verbosity).unwrap_err();
    assert!(matches!(err, ShutdownError::AlreadyInitialized { .. }));

    // Subsystems waiting on the context from other tasks.
    let waiters: Vec<_> = (0..4)
        .map(|_| {
            tokio::spawn(async {
                let ctx = context();
                ctx.cancelled().await;
                ctx.id()
            })
        })
        .collect();

    assert!(watcher.notify(TerminationSignal::Simulated));

    for waiter in waiters {
        let id = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should observe cancellation")
            .unwrap();
        assert_eq!(id, published.id());
    }

    let late = try_context().unwrap();
    assert!(late.is_cancelled());
    assert!(late.same_instance(&early));
    assert!(verbosity.current().unwrap() >= LevelFilter::INFO);

    drop(dispatch);
}
