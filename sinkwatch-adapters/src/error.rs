//! Error types for sinks.

use thiserror::Error;

/// Errors that can occur when querying a sink.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    /// The sink cannot be reached at all.
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// The sink rejected or failed the query.
    #[error("Query failed: {0}")]
    Query(String),

    /// Failed to parse a stored record.
    #[error("Failed to parse record: {0}")]
    Parse(String),

    /// Timeout waiting for the sink.
    #[error("Query timed out")]
    Timeout,
}

impl SinkError {
    /// Whether the failure should abort the evaluation that hit it.
    ///
    /// Only connectivity loss is fatal; anything else degrades to
    /// "no record found" for the affected sink.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SinkError::Unavailable(_))
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Parse(err.to_string())
    }
}

#[cfg(feature = "jsonl")]
impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            SinkError::Timeout
        } else {
            SinkError::Unavailable(err.to_string())
        }
    }
}
