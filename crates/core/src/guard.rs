use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::diag::{DiagnosticSink, TracingSink};
use crate::error::{Result, SaveError};
use crate::scope::Scope;

/// How a guarded call ended.
#[derive(Debug)]
pub enum CallOutcome<R> {
    /// The operation ran to completion while the scope was alive.
    Completed(R),
    /// A previous call was still in flight; the operation was not invoked.
    Busy,
    /// The operation completed after the scope was disposed; its result was
    /// discarded.
    Stale,
    /// The operation failed.
    Failed(SaveError),
}

impl<R> CallOutcome<R> {
    /// The completed result, if there is one.
    pub fn into_completed(self) -> Option<R> {
        match self {
            CallOutcome::Completed(result) => Some(result),
            _ => None,
        }
    }

    /// Whether the call was suppressed as a duplicate.
    pub fn is_busy(&self) -> bool {
        matches!(self, CallOutcome::Busy)
    }
}

/// Wraps asynchronous operations with duplicate suppression and
/// stale-result discard.
///
/// Clones share the in-flight flag, so a guard can be handed to spawned
/// tasks while the invariant of at most one outstanding operation holds
/// across all of them.
#[derive(Clone)]
pub struct CallGuard {
    scope: Scope,
    in_flight: Arc<AtomicBool>,
    sink: Arc<dyn DiagnosticSink>,
}

impl CallGuard {
    /// Create a guard reporting through the default tracing sink.
    pub fn new(scope: Scope) -> Self {
        Self::with_sink(scope, Arc::new(TracingSink))
    }

    /// Create a guard reporting through the given sink.
    pub fn with_sink(scope: Scope, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            scope,
            in_flight: Arc::new(AtomicBool::new(false)),
            sink,
        }
    }

    /// Whether a guarded operation is currently outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run `operation` unless another guarded call is still in flight.
    ///
    /// A duplicate invocation is a warned no-op; the wrapped operation is
    /// never polled. The in-flight flag is released on every exit path. A
    /// result arriving after the scope was disposed is discarded rather
    /// than handed back.
    pub async fn run<F, R>(&self, label: &str, operation: F) -> CallOutcome<R>
    where
        F: Future<Output = Result<R>>,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.sink
                .warn(&format!("{label}: call already in flight, ignoring"));
            return CallOutcome::Busy;
        }
        let _release = Release(self.in_flight.clone());
        match operation.await {
            Ok(result) if self.scope.is_alive() => CallOutcome::Completed(result),
            Ok(_) => CallOutcome::Stale,
            Err(err) => CallOutcome::Failed(err),
        }
    }
}

/// Clears the in-flight flag when dropped, covering every exit path.
struct Release(Arc<AtomicBool>);

impl Drop for Release {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::RecordingSink;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn completed_result_passes_through() {
        let guard = CallGuard::new(Scope::new());
        let outcome = guard.run("op", async { Ok(7) }).await;
        assert_eq!(outcome.into_completed(), Some(7));
    }

    #[tokio::test]
    async fn duplicate_call_is_suppressed() {
        let sink = Arc::new(RecordingSink::default());
        let guard = CallGuard::with_sink(Scope::new(), sink.clone());

        let (release_tx, release_rx) = oneshot::channel::<()>();
        let first = {
            let guard = guard.clone();
            tokio::spawn(async move {
                guard
                    .run("op", async move {
                        let _ = release_rx.await;
                        Ok(1)
                    })
                    .await
            })
        };
        while !guard.is_in_flight() {
            tokio::task::yield_now().await;
        }

        let second = guard.run("op", async { Ok(2) }).await;
        assert!(second.is_busy());
        assert!(sink.warnings().iter().any(|m| m.contains("in flight")));

        release_tx.send(()).unwrap();
        let first = first.await.unwrap();
        assert_eq!(first.into_completed(), Some(1));
        assert!(!guard.is_in_flight());
    }

    #[tokio::test]
    async fn stale_result_is_discarded() {
        let scope = Scope::new();
        let guard = CallGuard::new(scope.clone());

        let (done_tx, done_rx) = oneshot::channel::<()>();
        let task = {
            let guard = guard.clone();
            tokio::spawn(async move {
                guard
                    .run("op", async move {
                        let _ = done_rx.await;
                        Ok(3)
                    })
                    .await
            })
        };
        while !guard.is_in_flight() {
            tokio::task::yield_now().await;
        }

        scope.dispose();
        done_tx.send(()).unwrap();
        let outcome = task.await.unwrap();
        assert!(matches!(outcome, CallOutcome::Stale));
        assert!(!guard.is_in_flight());
    }

    #[tokio::test]
    async fn flag_released_after_failure() {
        let guard = CallGuard::new(Scope::new());
        let outcome: CallOutcome<()> = guard
            .run("op", async { Err(SaveError::failed("disk full")) })
            .await;
        assert!(matches!(outcome, CallOutcome::Failed(SaveError::Failed(_))));
        assert!(!guard.is_in_flight());

        let outcome = guard.run("op", async { Ok(()) }).await;
        assert!(matches!(outcome, CallOutcome::Completed(())));
    }

    #[tokio::test]
    async fn cancellation_surfaces_as_cancelled_failure() {
        let guard = CallGuard::new(Scope::new());
        let outcome: CallOutcome<()> = guard.run("op", async { Err(SaveError::Cancelled) }).await;
        match outcome {
            CallOutcome::Failed(err) => assert!(err.is_cancelled()),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
