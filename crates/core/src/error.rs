use std::fmt;
use std::io;

/// Result alias using `SaveError`.
pub type Result<T> = std::result::Result<T, SaveError>;

/// Ways a persistence attempt can end without completing.
#[derive(Debug)]
pub enum SaveError {
    /// The persistence callback failed.
    Failed(String),
    /// The operation observed a cooperative cancellation signal.
    ///
    /// Distinct from a failure: consumers must not report it at error
    /// level.
    Cancelled,
}

impl SaveError {
    /// Build a `Failed` error from any message.
    pub fn failed(msg: impl Into<String>) -> Self {
        SaveError::Failed(msg.into())
    }

    /// Whether this is a cancellation notice rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SaveError::Cancelled)
    }
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Failed(msg) => write!(f, "save failed: {msg}"),
            SaveError::Cancelled => write!(f, "save cancelled"),
        }
    }
}

impl std::error::Error for SaveError {}

impl From<io::Error> for SaveError {
    fn from(err: io::Error) -> Self {
        SaveError::Failed(err.to_string())
    }
}
