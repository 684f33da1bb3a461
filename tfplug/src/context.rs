//! Context implementation for request-scoped deadlines and cancellation
//!
//! Every resource operation receives a Context. Blocking waits inside an
//! operation (the settle poller) must stop when the context is cancelled
//! or its deadline passes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};

/// Context carries the deadline and cancellation signal of one operation
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Sender<bool>,
    parent: Option<Context>,
}

impl Context {
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done,
                parent: None,
            }),
        }
    }

    /// Derives a child context that expires after `timeout`, or earlier if
    /// this context's own deadline comes first. Cancelling the parent
    /// cancels the child.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let own = Instant::now() + timeout;
        let deadline = match self.inner.deadline {
            Some(parent) if parent < own => parent,
            _ => own,
        };
        let (done, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done,
                parent: Some(self.clone()),
            }),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline; None when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        if *self.inner.done.borrow() {
            return true;
        }
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        self.inner
            .parent
            .as_ref()
            .is_some_and(|parent| parent.is_cancelled())
    }

    pub fn cancel(&self) {
        self.inner.done.send_replace(true);
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub fn cancelled(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let mut done = self.inner.done.subscribe();
            let flagged = async move {
                // The sender lives as long as self, so this only ends on cancel
                let _ = done.wait_for(|cancelled| *cancelled).await;
            };
            let parent = async {
                match &self.inner.parent {
                    Some(parent) => parent.cancelled().await,
                    None => std::future::pending::<()>().await,
                }
            };
            let expired = async {
                match self.inner.deadline {
                    Some(deadline) => time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = flagged => {}
                _ = parent => {}
                _ = expired => {}
            }
        })
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));

        assert!(!ctx.is_cancelled());

        sleep(Duration::from_millis(150)).await;

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();

        assert!(!ctx.is_cancelled());

        ctx.cancel();

        assert!(ctx.is_cancelled());
        ctx.cancelled().await;
    }

    #[tokio::test]
    async fn context_deadline() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());

        let ctx_with_timeout = ctx.with_timeout(Duration::from_secs(1));
        assert!(ctx_with_timeout.deadline().is_some());
        assert!(ctx_with_timeout.remaining().unwrap() <= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn child_keeps_the_earlier_parent_deadline() {
        let parent = Context::new().with_timeout(Duration::from_secs(5));
        let child = parent.with_timeout(Duration::from_secs(60));

        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test]
    async fn cancelling_parent_cancels_child() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_secs(60));

        parent.cancel();

        assert!(child.is_cancelled());
        child.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_future_resolves_at_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_secs(2));
        let start = Instant::now();

        ctx.cancelled().await;

        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
