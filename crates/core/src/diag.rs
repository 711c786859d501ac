/// Destination for the pipeline's diagnostics.
///
/// Injected by the host so the mechanism stays transport-agnostic; nothing
/// here logs to a global directly.
pub trait DiagnosticSink: Send + Sync {
    /// Report a suppressed or suspicious condition.
    fn warn(&self, message: &str);
    /// Report a failure.
    fn error(&self, message: &str);
}

/// Default sink forwarding to the `tracing` facade.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Sink that remembers everything it was told, for assertions.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    entries: std::sync::Mutex<Vec<(&'static str, String)>>,
}

#[cfg(test)]
impl RecordingSink {
    pub(crate) fn warnings(&self) -> Vec<String> {
        self.level("warn")
    }

    pub(crate) fn errors(&self) -> Vec<String> {
        self.level("error")
    }

    fn level(&self, level: &str) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[cfg(test)]
impl DiagnosticSink for RecordingSink {
    fn warn(&self, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push(("warn", message.to_string()));
    }

    fn error(&self, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push(("error", message.to_string()));
    }
}
