//! "Any"/"all" completion gate.
//!
//! An [`AnyAllGate`] tracks a population of children. Each child completes at
//! most once. Callers can wait until *any* child has completed (a latch that
//! stays closed forever after the first completion) or until *all* registered
//! children have completed.
//!
//! Both conditions are derived from one `(registered, completed)` pair held in
//! a `tokio::sync::watch` channel, so the latch and the barrier can never
//! disagree about how many children finished.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Progress {
    registered: usize,
    completed: usize,
}

/// Completion gate with "any" and "all" wait semantics.
///
/// Cloning yields another handle to the same gate.
#[derive(Debug, Clone)]
pub struct AnyAllGate {
    progress: Arc<watch::Sender<Progress>>,
}

impl Default for AnyAllGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AnyAllGate {
    /// Create a gate with no children.
    #[must_use]
    pub fn new() -> Self {
        let (progress, _) = watch::channel(Progress::default());
        Self {
            progress: Arc::new(progress),
        }
    }

    /// Register a new pending child.
    #[must_use]
    pub fn register(&self) -> GateChild {
        self.progress.send_modify(|p| p.registered += 1);
        GateChild {
            progress: Arc::clone(&self.progress),
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wait until at least one child has completed.
    ///
    /// Returns immediately once that has happened. With no children this never
    /// returns; callers bound it with their own timeout.
    pub async fn wait_any(&self) {
        let mut rx = self.progress.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|p| p.completed > 0).await;
    }

    /// Wait until every child registered at the time of the check has
    /// completed. Returns immediately when there are no children.
    pub async fn wait_all(&self) {
        let mut rx = self.progress.subscribe();
        let _ = rx.wait_for(|p| p.completed >= p.registered).await;
    }

    /// Whether any child has completed.
    #[must_use]
    pub fn any_done(&self) -> bool {
        self.progress.borrow().completed > 0
    }

    /// Whether every registered child has completed.
    #[must_use]
    pub fn all_done(&self) -> bool {
        let p = *self.progress.borrow();
        p.completed >= p.registered
    }

    /// Number of registered children.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.progress.borrow().registered
    }
}

/// Handle for one child of an [`AnyAllGate`].
///
/// Clones share the same completion state.
#[derive(Debug, Clone)]
pub struct GateChild {
    progress: Arc<watch::Sender<Progress>>,
    done: Arc<AtomicBool>,
}

impl GateChild {
    /// Mark this child complete. Only the first call has an effect.
    pub fn complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.progress.send_modify(|p| p.completed += 1);
        tracing::trace!(target: "jwtauth.gate", "Gate child completed");
    }

    /// Whether [`GateChild::complete`] has been called.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const SHORT: Duration = Duration::from_millis(50);
    const LONG: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_wait_any_returns_after_first_completion() {
        let gate = AnyAllGate::new();
        let a = gate.register();
        let _b = gate.register();

        assert!(timeout(SHORT, gate.wait_any()).await.is_err());

        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait_any().await }
        });
        a.complete();

        timeout(LONG, waiter).await.unwrap().unwrap();
        assert!(gate.any_done());
        assert!(!gate.all_done());
    }

    #[tokio::test]
    async fn test_wait_any_latches() {
        let gate = AnyAllGate::new();
        gate.register().complete();

        timeout(LONG, gate.wait_any()).await.unwrap();
        timeout(LONG, gate.wait_any()).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_all_requires_every_child() {
        let gate = AnyAllGate::new();
        let a = gate.register();
        let b = gate.register();

        a.complete();
        assert!(timeout(SHORT, gate.wait_all()).await.is_err());

        b.complete();
        timeout(LONG, gate.wait_all()).await.unwrap();
        assert!(gate.all_done());
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let gate = AnyAllGate::new();
        let a = gate.register();
        let b = gate.register();

        a.complete();
        a.complete();
        a.clone().complete();

        assert!(a.is_complete());
        assert!(!b.is_complete());
        assert!(
            timeout(SHORT, gate.wait_all()).await.is_err(),
            "repeated completion of one child must not satisfy the barrier"
        );
    }

    #[tokio::test]
    async fn test_zero_children() {
        let gate = AnyAllGate::new();

        timeout(LONG, gate.wait_all()).await.unwrap();
        assert!(timeout(SHORT, gate.wait_any()).await.is_err());
        assert_eq!(gate.registered(), 0);
    }

    #[tokio::test]
    async fn test_many_concurrent_completions() {
        let gate = AnyAllGate::new();
        let children: Vec<GateChild> = (0..32).map(|_| gate.register()).collect();

        let tasks: Vec<_> = children
            .into_iter()
            .map(|child| tokio::spawn(async move { child.complete() }))
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        timeout(LONG, gate.wait_all()).await.unwrap();
        assert_eq!(gate.registered(), 32);
    }
}
