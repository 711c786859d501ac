use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Lifecycle of the consumer that owns a pipeline.
///
/// The host creates a scope when the consumer comes to life and disposes it
/// exactly once at teardown. Clones share the same state, so a scope can be
/// handed to the pipeline while the host keeps one for `dispose`.
#[derive(Debug, Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

#[derive(Debug)]
struct ScopeInner {
    alive: AtomicBool,
    token: CancellationToken,
}

impl Scope {
    /// Create a live scope.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                alive: AtomicBool::new(true),
                token: CancellationToken::new(),
            }),
        }
    }

    /// Whether the owning consumer is still active. Always safe to call.
    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    /// Tear down the scope.
    ///
    /// Liveness flips false exactly once and the cancellation token fires at
    /// the same moment. Idempotent. Work already in progress is not
    /// terminated, only informed; its result is discarded by the guard.
    pub fn dispose(&self) {
        if self.inner.alive.swap(false, Ordering::AcqRel) {
            self.inner.token.cancel();
        }
    }

    /// Cancellation signal handed to downstream asynchronous work.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Resolves once the scope has been disposed.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await;
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_scope_is_alive() {
        assert!(Scope::new().is_alive());
    }

    #[tokio::test]
    async fn dispose_flips_liveness_and_cancels() {
        let scope = Scope::new();
        let token = scope.cancellation_token();
        assert!(!token.is_cancelled());

        scope.dispose();
        assert!(!scope.is_alive());
        assert!(token.is_cancelled());
        scope.cancelled().await;

        // second dispose is a no-op
        scope.dispose();
        assert!(!scope.is_alive());
    }

    #[test]
    fn clones_share_state() {
        let scope = Scope::new();
        let other = scope.clone();
        other.dispose();
        assert!(!scope.is_alive());
    }
}
