//! Error types for monitor evaluation.

use thiserror::Error;

use sinkwatch_adapters::SinkError;
use sinkwatch_types::SinkId;

use crate::store::StoreError;

/// Errors that abort the evaluation of one monitor.
///
/// None of these leave a monitor half-updated: activity and status fields
/// are only written once the sink scan has completed, and alert bookkeeping
/// only once the alert itself is stored.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A watched sink could not be reached.
    #[error("sink {sink} unavailable: {source}")]
    SinkUnavailable {
        sink: SinkId,
        #[source]
        source: SinkError,
    },

    /// The alert record could not be stored.
    #[error("failed to persist alert: {0}")]
    AlertPersistenceFailed(#[source] StoreError),

    /// The monitor could not be loaded or saved.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Alerts can only be raised for monitors that have been saved.
    #[error("monitor {name:?} has not been saved yet")]
    NotPersisted { name: String },

    /// A fetched document could not be rendered.
    #[error("failed to render document: {0}")]
    Render(#[source] serde_json::Error),
}

impl MonitorError {
    /// Whether a later evaluation could succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MonitorError::SinkUnavailable { .. }
                | MonitorError::AlertPersistenceFailed(_)
                | MonitorError::Store(StoreError::Conflict { .. })
                | MonitorError::Store(StoreError::Io { .. })
                | MonitorError::Store(StoreError::Unavailable(_))
        )
    }
}
