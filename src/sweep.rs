//! Batch evaluation of many monitors.

use futures_util::future::join_all;
use tracing::{debug, error};

use sinkwatch_types::{Alert, Monitor, SinkId, Status};

use crate::engine::{StatusUpdate, Watchdog};
use crate::MonitorError;

/// How one monitor fared in a sweep.
#[derive(Debug)]
pub struct MonitorOutcome {
    /// The monitor as it stands after the update attempt.
    pub monitor: Monitor,
    pub result: Result<StatusUpdate, MonitorError>,
}

impl MonitorOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of a sweep, in store order.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub outcomes: Vec<MonitorOutcome>,
}

impl SweepReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Monitors that could not be evaluated.
    pub fn failures(&self) -> impl Iterator<Item = (&Monitor, &MonitorError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.monitor, e)))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Alerts raised during the sweep.
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().and_then(|u| u.alert.as_ref()))
    }

    /// Number of monitors evaluated as unhealthy.
    pub fn unhealthy(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.result, Ok(u) if u.status == Status::Unhealthy))
            .count()
    }
}

impl Watchdog {
    /// Update every enabled monitor, concurrently.
    ///
    /// A monitor that fails to evaluate does not stop the others; its error
    /// is recorded in the report. Only failing to list the monitors is an
    /// error here.
    pub async fn sweep(&self) -> Result<SweepReport, MonitorError> {
        let monitors = self.monitors().find_enabled().await?;
        Ok(self.run(monitors).await)
    }

    /// Update every enabled monitor that watches `sink`.
    pub async fn sweep_watching(&self, sink: &SinkId) -> Result<SweepReport, MonitorError> {
        let monitors = self.monitors().find_watching(sink).await?;
        Ok(self.run(monitors).await)
    }

    async fn run(&self, monitors: Vec<Monitor>) -> SweepReport {
        debug!(count = monitors.len(), "Sweeping monitors");
        let updates = monitors.into_iter().map(|mut monitor| async move {
            let result = self.update(&mut monitor).await;
            if let Err(e) = &result {
                error!(monitor = %monitor.name, error = %e, "Failed to update monitor");
            }
            MonitorOutcome { monitor, result }
        });
        SweepReport {
            outcomes: join_all(updates).await,
        }
    }
}
