use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Debounce a stream of observed values.
///
/// Each value restarts a quiet-period countdown; `settled` yields a value
/// only once it has survived the full period without being superseded. The
/// very first value settles immediately, with no countdown.
pub struct Debouncer<T> {
    delay: Duration,
    handle: Option<JoinHandle<()>>,
    expiry_tx: mpsc::UnboundedSender<u64>,
    expiry_rx: mpsc::UnboundedReceiver<u64>,
    pending: Option<T>,
    generation: u64,
    primed: bool,
}

impl<T> Debouncer<T> {
    /// Create a new `Debouncer` with the specified quiet period.
    ///
    /// A zero period settles each value on the next scheduling tick.
    pub fn new(delay: Duration) -> Self {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        Self {
            delay,
            handle: None,
            expiry_tx,
            expiry_rx,
            pending: None,
            generation: 0,
            primed: false,
        }
    }

    /// Observe a new value, restarting the countdown.
    ///
    /// If called again before the countdown elapses, the pending countdown
    /// is cancelled and rescheduled for the new value.
    pub fn observe(&mut self, value: T) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.pending = Some(value);
        self.generation += 1;
        let generation = self.generation;
        if !self.primed {
            self.primed = true;
            let _ = self.expiry_tx.send(generation);
            return;
        }
        let tx = self.expiry_tx.clone();
        let delay = self.delay;
        self.handle = Some(tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(generation);
        }));
    }

    /// Wait for the next settled value.
    ///
    /// Pends indefinitely while no countdown is running, which makes it safe
    /// to park in a `select!` arm. Expiry markers from superseded countdowns
    /// carry a stale generation and are ignored.
    pub async fn settled(&mut self) -> T {
        loop {
            // `None` is unreachable: the sender half lives in `self`.
            if let Some(generation) = self.expiry_rx.recv().await {
                if generation == self.generation {
                    if let Some(value) = self.pending.take() {
                        return value;
                    }
                }
            }
        }
    }

    /// Cancel any running countdown and hand back the buffered value.
    ///
    /// Flush paths use this to get at the latest observed value without
    /// waiting out the quiet period.
    pub fn take_pending(&mut self) -> Option<T> {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation += 1;
        self.pending.take()
    }
}
