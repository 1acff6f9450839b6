//! Alerts raised by monitors.

use chrono::{DateTime, Utc};

use crate::{AlertId, AlertLevel, MonitorId, SinkId};

/// The content of an alert before it has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewAlert {
    pub title: String,
    pub level: AlertLevel,
    /// Monitor that raised the alert.
    pub monitor: MonitorId,
    /// Sink of the last observed record, if any.
    pub sink: Option<SinkId>,
    /// Id of the last observed record, if any.
    pub record_id: Option<String>,
}

/// A persisted alert. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alert {
    pub id: AlertId,
    pub title: String,
    pub level: AlertLevel,
    /// Lookup reference to the raising monitor, not ownership.
    pub monitor: MonitorId,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub sink: Option<SinkId>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub record_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Materialize a new alert with a store-assigned id and creation time.
    pub fn from_new(id: AlertId, created_at: DateTime<Utc>, new: NewAlert) -> Self {
        Self {
            id,
            title: new.title,
            level: new.level,
            monitor: new.monitor,
            sink: new.sink,
            record_id: new.record_id,
            created_at,
        }
    }
}
