//! The shared shutdown context.
//!
//! A [`ShutdownContext`] answers one question for every subsystem: is the
//! process still running? Clones share a single cancellation state, so a
//! cancel through any clone is seen by all of them, before or after it
//! happens.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

struct Inner {
    id: Uuid,
    token: CancellationToken,
    cancelled: AtomicBool,
}

/// Cancellable, ownership-shared handle for the lifetime of the process.
#[derive(Clone)]
pub struct ShutdownContext {
    inner: Arc<Inner>,
}

impl ShutdownContext {
    /// Create a new root context in the running state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                token: CancellationToken::new(),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// Identifier attached to log records for correlation.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Cancel the context.
    ///
    /// Returns `true` for the call that performed the transition and
    /// `false` for every later call, which is a no-op.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.inner.token.cancel();
        true
    }

    /// Whether the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Completes once the context is cancelled; immediately if it already is.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.inner.token.cancelled()
    }

    /// A token that is cancelled together with this context but can also be
    /// cancelled on its own without affecting the context.
    pub fn child_token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }

    /// Whether both handles refer to the same context.
    pub fn same_instance(&self, other: &ShutdownContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ShutdownContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShutdownContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownContext")
            .field("id", &self.inner.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl fmt::Display for ShutdownContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_context_is_running() {
        let ctx = ShutdownContext::new();
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_cancel_transitions_exactly_once() {
        let ctx = ShutdownContext::new();
        assert!(ctx.cancel());
        for _ in 0..10 {
            assert!(!ctx.cancel());
            assert!(ctx.is_cancelled());
        }
    }

    #[test]
    fn test_clones_share_state() {
        let ctx = ShutdownContext::new();
        let clone = ctx.clone();
        assert!(ctx.same_instance(&clone));
        assert_eq!(ctx.id(), clone.id());

        clone.cancel();
        assert!(ctx.is_cancelled());
        assert!(!ctx.cancel());
    }

    #[test]
    fn test_distinct_contexts_are_independent() {
        let a = ShutdownContext::new();
        let b = ShutdownContext::new();
        assert!(!a.same_instance(&b));
        assert_ne!(a.id(), b.id());

        a.cancel();
        assert!(!b.is_cancelled());
    }

    #[test]
    fn test_child_token_follows_parent_only() {
        let ctx = ShutdownContext::new();

        let local = ctx.child_token();
        local.cancel();
        assert!(!ctx.is_cancelled());

        let child = ctx.child_token();
        ctx.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let ctx = ShutdownContext::new();
        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.cancelled().await })
        };

        tokio::task::yield_now().await;
        ctx.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_the_fact() {
        let ctx = ShutdownContext::new();
        ctx.cancel();
        tokio::time::timeout(Duration::from_millis(100), ctx.cancelled())
            .await
            .expect("already cancelled context should resolve immediately");
    }

    #[test]
    fn test_display_is_id() {
        let ctx = ShutdownContext::new();
        assert_eq!(ctx.to_string(), ctx.id().to_string());
        assert!(format!("{ctx:?}").contains("cancelled: false"));
    }
}
