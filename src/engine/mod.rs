//! Monitor evaluation.
//!
//! [`Watchdog`] ties the pieces together:
//!
//! - [`scanner`] finds the newest record across a monitor's sinks
//! - [`evaluator`] turns time since that record into a [`Status`]
//! - [`policy`] decides whether an unhealthy monitor should alert
//! - [`emitter`] stores the alert and records it on the monitor
//!
//! Saving a monitor always refreshes it first, so a stored status is never
//! older than the save that wrote it.

pub mod emitter;
pub mod evaluator;
pub mod policy;
pub mod scanner;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use sinkwatch_adapters::{Document, SinkRegistry};
use sinkwatch_types::{Alert, Monitor, MonitorId, Status};

use crate::clock::Clock;
use crate::store::{AlertStore, MonitorStore};
use crate::MonitorError;

/// Result of one [`Watchdog::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    /// Status before the update.
    pub previous: Status,
    pub status: Status,
    /// The alert raised by this update, if any.
    pub alert: Option<Alert>,
}

impl StatusUpdate {
    pub fn changed(&self) -> bool {
        self.previous != self.status
    }
}

/// Evaluates monitors against their sinks and raises alerts.
pub struct Watchdog {
    sinks: SinkRegistry,
    monitors: Arc<dyn MonitorStore>,
    alerts: Arc<dyn AlertStore>,
    clock: Arc<dyn Clock>,
    /// One lock per stored monitor, held for a whole update. Entries are
    /// dropped once no update holds or waits on them.
    locks: Mutex<HashMap<MonitorId, Arc<AsyncMutex<()>>>>,
}

impl Watchdog {
    pub fn new(
        sinks: SinkRegistry,
        monitors: Arc<dyn MonitorStore>,
        alerts: Arc<dyn AlertStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sinks,
            monitors,
            alerts,
            clock,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn sinks(&self) -> &SinkRegistry {
        &self.sinks
    }

    pub fn monitors(&self) -> &dyn MonitorStore {
        self.monitors.as_ref()
    }

    pub fn alerts(&self) -> &dyn AlertStore {
        self.alerts.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Scan for new activity and recompute the status, without saving.
    ///
    /// Monitors that have never been saved are not scanned. If the scan
    /// fails the monitor is left unchanged.
    pub async fn refresh(
        &self,
        monitor: &mut Monitor,
        now: DateTime<Utc>,
    ) -> Result<Status, MonitorError> {
        if monitor.is_new() {
            debug!(monitor = %monitor.name, "Monitor not saved yet, skipping activity scan");
        } else {
            scanner::refresh_activity(monitor, &self.sinks, now).await?;
        }
        Ok(evaluator::apply(monitor, now))
    }

    /// Refresh the monitor and persist it.
    pub async fn save(&self, monitor: &mut Monitor) -> Result<(), MonitorError> {
        self.save_at(monitor, self.clock.now()).await
    }

    /// Evaluate a monitor and alert if the policy says so.
    ///
    /// Concurrent updates of the same monitor through this watchdog run one
    /// after the other. An update from a stale copy fails with a store
    /// conflict instead of alerting twice.
    pub async fn update(&self, monitor: &mut Monitor) -> Result<StatusUpdate, MonitorError> {
        let id = monitor.id;
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock().await;
            self.update_locked(monitor).await
        };
        drop(lock);
        if let Some(id) = id {
            self.release(id);
        }
        result
    }

    async fn update_locked(&self, monitor: &mut Monitor) -> Result<StatusUpdate, MonitorError> {
        let now = self.clock.now();
        let previous = monitor.status;

        self.save_at(monitor, now).await?;
        let status = monitor.status;
        if status != previous {
            info!(
                monitor = %monitor.name,
                from = %previous,
                to = %status,
                "Monitor status changed"
            );
        }

        let mut alert = None;
        if status == Status::Unhealthy {
            let decision = policy::decide(monitor, previous, status, now);
            debug!(monitor = %monitor.name, ?decision, "Alert policy evaluated");
            if decision.fire {
                alert = Some(self.emit_at(monitor, now).await?);
            }
        }

        Ok(StatusUpdate {
            previous,
            status,
            alert,
        })
    }

    /// Evaluate a monitor, alerting if due, and return its new status.
    pub async fn update_status(&self, monitor: &mut Monitor) -> Result<Status, MonitorError> {
        Ok(self.update(monitor).await?.status)
    }

    /// Raise an alert for `monitor` now, regardless of policy, and persist
    /// the alert bookkeeping.
    pub async fn emit(&self, monitor: &mut Monitor) -> Result<Alert, MonitorError> {
        self.emit_at(monitor, self.clock.now()).await
    }

    /// Fetch the monitor's newest known record, rendered as indented JSON.
    ///
    /// Returns `None` if no activity has been seen, or the record can no
    /// longer be found.
    pub async fn last_document(&self, monitor: &Monitor) -> Result<Option<String>, MonitorError> {
        let (Some(sink_id), Some(record)) =
            (&monitor.last_active_sink, &monitor.last_saved_record_id)
        else {
            return Ok(None);
        };
        let Some(sink) = self.sinks.get(sink_id) else {
            warn!(monitor = %monitor.name, sink = %sink_id, "Last active sink is not registered");
            return Ok(None);
        };

        match sink.find_by_id(record).await {
            Ok(Some(doc)) => render(&doc).map(Some),
            Ok(None) => Ok(None),
            Err(e) if e.is_fatal() => Err(MonitorError::SinkUnavailable {
                sink: sink_id.clone(),
                source: e,
            }),
            Err(e) => {
                warn!(
                    monitor = %monitor.name,
                    sink = %sink_id,
                    error = %e,
                    "Failed to fetch last document"
                );
                Ok(None)
            }
        }
    }

    async fn save_at(
        &self,
        monitor: &mut Monitor,
        now: DateTime<Utc>,
    ) -> Result<(), MonitorError> {
        let mut next = monitor.clone();
        self.refresh(&mut next, now).await?;
        self.monitors.save(&mut next).await?;
        *monitor = next;
        Ok(())
    }

    /// Store the alert, then persist the monitor with its status evaluated at
    /// the same instant. No rescan happens between the two.
    async fn emit_at(
        &self,
        monitor: &mut Monitor,
        now: DateTime<Utc>,
    ) -> Result<Alert, MonitorError> {
        let mut next = monitor.clone();
        let alert = emitter::emit(&mut next, self.alerts.as_ref(), now).await?;
        evaluator::apply(&mut next, now);
        self.monitors.save(&mut next).await?;
        *monitor = next;
        Ok(alert)
    }

    /// Unsaved monitors get a lock of their own; the store assigns their id.
    fn lock_for(&self, id: Option<MonitorId>) -> Arc<AsyncMutex<()>> {
        match id {
            Some(id) => self.locks.lock().entry(id).or_default().clone(),
            None => Arc::default(),
        }
    }

    fn release(&self, id: MonitorId) {
        let mut locks = self.locks.lock();
        if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&id);
        }
    }
}

impl fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchdog")
            .field("sinks", &self.sinks)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

fn render(doc: &Document) -> Result<String, MonitorError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser).map_err(MonitorError::Render)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
