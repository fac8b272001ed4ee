use thiserror::Error;

/// Errors surfaced by the tracker core.
///
/// Parse failures are normally recovered inside the adapters and only show up
/// here when a caller asks for the strict variant of an operation.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No adapter found for url: {0}")]
    NoAdapterFound(String),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Store connection lock poisoned")]
    StoreLock,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        TrackerError::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
