use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::debounce::Debouncer;
use crate::diag::{DiagnosticSink, TracingSink};
use crate::error::Result;
use crate::guard::{CallGuard, CallOutcome};
use crate::scope::Scope;

/// Persistence callback: receives the value to save and a cancellation
/// token that fires when the owning scope is disposed.
pub type SaveFn<T> =
    Arc<dyn Fn(T, CancellationToken) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Predicate deciding whether two values are the same for save purposes.
pub type EqualFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Box a save closure into the [`SaveFn`] shape.
pub fn save_fn<T, F, Fut>(f: F) -> SaveFn<T>
where
    F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |value, token| Box::pin(f(value, token)))
}

/// Auto-save tuning knobs.
#[derive(Debug, Clone)]
pub struct AutoSaveConfig {
    /// Quiet period a value must survive unchanged before it is saved.
    pub delay: Duration,
    /// Whether saving starts out enabled.
    pub enabled: bool,
}

impl AutoSaveConfig {
    /// Default quiet period (2 seconds).
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

    /// Create a config with the default quiet period, saving enabled.
    pub fn new() -> Self {
        Self {
            delay: Self::DEFAULT_DELAY,
            enabled: true,
        }
    }

    /// Set the quiet period.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set whether saving starts out enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self::new()
    }
}

enum AutoSaveCmd<T> {
    Observe(T),
    Flush(oneshot::Sender<()>),
}

/// Handle feeding values into a running auto-save pipeline.
///
/// The pipeline debounces observed values, compares each settled value
/// against the last-persisted snapshot, and dispatches the save callback
/// fire-and-forget for genuine changes. The first settlement only seeds the
/// comparison baseline: the value already present when the pipeline came up
/// is never saved.
///
/// Dropping the handle stops the pipeline. An in-flight save still runs to
/// completion, but its result is discarded once the scope is disposed.
pub struct AutoSave<T> {
    cmd: mpsc::UnboundedSender<AutoSaveCmd<T>>,
    enabled: Arc<AtomicBool>,
}

impl<T> AutoSave<T>
where
    T: Clone + Send + 'static,
{
    /// Spawn a pipeline using structural equality and the default sink.
    pub fn spawn(scope: Scope, config: AutoSaveConfig, save: SaveFn<T>) -> Self
    where
        T: PartialEq,
    {
        Self::spawn_with(
            scope,
            config,
            save,
            Arc::new(|a: &T, b: &T| a == b),
            Arc::new(TracingSink),
        )
    }

    /// Spawn a pipeline with a custom equality predicate and sink.
    pub fn spawn_with(
        scope: Scope,
        config: AutoSaveConfig,
        save: SaveFn<T>,
        equal: EqualFn<T>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let enabled = Arc::new(AtomicBool::new(config.enabled));
        let runner = Runner {
            scope: scope.clone(),
            guard: CallGuard::with_sink(scope, sink.clone()),
            save,
            equal,
            sink,
            enabled: enabled.clone(),
            baseline: None,
            last_save: None,
        };
        tokio::spawn(runner.run(config.delay, cmd_rx));
        Self {
            cmd: cmd_tx,
            enabled,
        }
    }

    /// Feed the current value into the pipeline.
    pub fn observe(&self, value: T) {
        let _ = self.cmd.send(AutoSaveCmd::Observe(value));
    }

    /// Enable or disable saving.
    ///
    /// Disabling suppresses subsequent dispatches immediately; it does not
    /// cancel a save already in flight. The comparison baseline holds while
    /// disabled, so a change that settles after re-enabling is still saved.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Whether saving is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Push any buffered value through the save policy immediately instead
    /// of waiting out the quiet period.
    ///
    /// Resolves once the most recently dispatched save has settled, so a
    /// caller about to tear down can rely on the flushed snapshot having
    /// reached the callback.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.cmd.send(AutoSaveCmd::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

struct Runner<T> {
    scope: Scope,
    guard: CallGuard,
    save: SaveFn<T>,
    equal: EqualFn<T>,
    sink: Arc<dyn DiagnosticSink>,
    enabled: Arc<AtomicBool>,
    baseline: Option<T>,
    last_save: Option<JoinHandle<()>>,
}

impl<T> Runner<T>
where
    T: Clone + Send + 'static,
{
    async fn run(mut self, delay: Duration, mut cmd_rx: mpsc::UnboundedReceiver<AutoSaveCmd<T>>) {
        let token = self.scope.cancellation_token();
        let mut debounce = Debouncer::new(delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(AutoSaveCmd::Observe(value)) => debounce.observe(value),
                    Some(AutoSaveCmd::Flush(done)) => {
                        if let Some(value) = debounce.take_pending() {
                            self.on_settled(value);
                        }
                        match self.last_save.take() {
                            Some(handle) => {
                                tokio::spawn(async move {
                                    let _ = handle.await;
                                    let _ = done.send(());
                                });
                            }
                            None => {
                                let _ = done.send(());
                            }
                        }
                    }
                    None => break,
                },
                value = debounce.settled() => self.on_settled(value),
            }
        }
    }

    fn on_settled(&mut self, value: T) {
        let Some(baseline) = &self.baseline else {
            // First settlement seeds the baseline: this value was already
            // present when the pipeline came up, so it is not saved.
            self.baseline = Some(value);
            return;
        };
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        if (self.equal)(baseline, &value) {
            return;
        }
        // The baseline advances at dispatch time, not on completion, so a
        // failed save is not retried until the value changes again.
        self.baseline = Some(value.clone());
        self.dispatch(value);
    }

    fn dispatch(&mut self, value: T) {
        let guard = self.guard.clone();
        let sink = self.sink.clone();
        let future = (self.save)(value, self.scope.cancellation_token());
        self.last_save = Some(tokio::spawn(async move {
            match guard.run("auto-save", future).await {
                CallOutcome::Completed(()) => {}
                CallOutcome::Busy | CallOutcome::Stale => {}
                CallOutcome::Failed(err) if err.is_cancelled() => {}
                CallOutcome::Failed(err) => sink.error(&format!("auto-save failed: {err}")),
            }
        }));
    }
}
