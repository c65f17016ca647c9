//! Error types for homeboard.

use thiserror::Error;

/// Errors that can occur while loading, fetching or persisting events.
///
/// Most of these never reach a caller of the read API: the aggregation and
/// cache layers log them and substitute an empty or stale result instead.
#[derive(Error, Debug)]
pub enum HomeboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid recurring rule: {0}")]
    InvalidRule(String),

    #[error("Recurring rule {0} not found")]
    RuleNotFound(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl HomeboardError {
    pub(crate) fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        HomeboardError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for homeboard operations.
pub type HomeboardResult<T> = Result<T, HomeboardError>;
