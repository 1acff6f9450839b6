//! Persistence of monitors and alerts.
//!
//! The engine only talks to the [`MonitorStore`] and [`AlertStore`] traits.
//! Two families of implementations ship with the crate:
//!
//! - [`memory`]: process-local maps, for embedding and tests
//! - [`file`]: a JSON state file for monitors and an append-only JSON-lines
//!   log for alerts, for the command line tool
//!
//! ## Concurrent writers
//!
//! Every monitor carries a `revision`. A save succeeds only if the stored
//! revision still equals the one the caller loaded, and bumps it on success.
//! A stale save fails with [`StoreError::Conflict`] and changes nothing.

pub mod file;
pub mod memory;

pub use file::{JsonFileMonitorStore, JsonlAlertStore};
pub use memory::{MemoryAlertStore, MemoryMonitorStore};

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use sinkwatch_types::{Alert, Monitor, MonitorId, NewAlert, SinkId};

/// Errors raised by stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer saved the monitor since it was loaded.
    #[error("monitor {id} was modified concurrently (expected revision {expected}, found {found})")]
    Conflict {
        id: MonitorId,
        expected: u64,
        found: u64,
    },

    /// The monitor has an id the store does not know.
    #[error("monitor {0} not found")]
    NotFound(MonitorId),

    /// A monitor with the same name already exists.
    #[error("a monitor named {0:?} already exists")]
    DuplicateName(String),

    #[error("I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Persistence of monitors.
#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// Insert or update a monitor.
    ///
    /// New monitors get an id. On success the monitor's `revision` is
    /// bumped and `updated_at` stamped, both in the store and on `monitor`.
    async fn save(&self, monitor: &mut Monitor) -> Result<(), StoreError>;

    async fn get(&self, id: MonitorId) -> Result<Option<Monitor>, StoreError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Monitor>, StoreError>;

    /// All monitors, ordered by id.
    async fn all(&self) -> Result<Vec<Monitor>, StoreError>;

    /// Enabled monitors, ordered by id.
    async fn find_enabled(&self) -> Result<Vec<Monitor>, StoreError> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|m| m.enabled)
            .collect())
    }

    /// Enabled monitors that watch `sink`, ordered by id.
    async fn find_watching(&self, sink: &SinkId) -> Result<Vec<Monitor>, StoreError> {
        Ok(self
            .find_enabled()
            .await?
            .into_iter()
            .filter(|m| m.watches(sink))
            .collect())
    }
}

/// Persistence of alerts.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Persist an alert. The store assigns its id and creation time.
    async fn create(&self, alert: NewAlert) -> Result<Alert, StoreError>;

    /// Alerts raised by one monitor, oldest first.
    async fn list_for(&self, monitor: MonitorId) -> Result<Vec<Alert>, StoreError>;
}
