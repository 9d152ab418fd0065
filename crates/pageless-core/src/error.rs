use thiserror::Error;

#[derive(Error, Debug)]
pub enum PagelessError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Fetch failed for items {start}..{end}: {reason}")]
    Fetch {
        start: usize,
        end: usize,
        reason: String,
    },

    #[error("Gap not found: {0}")]
    GapNotFound(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PagelessError {
    /// Whether a later scan can recover from this error by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Io(_))
    }
}
