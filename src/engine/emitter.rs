//! Alert construction and bookkeeping.

use chrono::{DateTime, Utc};
use tracing::info;

use sinkwatch_types::{Alert, Monitor, NewAlert};

use super::evaluator;
use crate::store::AlertStore;
use crate::MonitorError;

/// The alert title for `monitor` as of `now`.
pub fn title(monitor: &Monitor, now: DateTime<Utc>) -> String {
    format!(
        "Health monitor \"{}\" has seen no activity for over {}.",
        monitor.name,
        evaluator::evaluate(monitor, now).downtime()
    )
}

/// Build the alert record for `monitor`.
///
/// Points at the newest record the monitor has seen, if any.
pub fn new_alert(monitor: &Monitor, now: DateTime<Utc>) -> Result<NewAlert, MonitorError> {
    let id = monitor.id.ok_or_else(|| MonitorError::NotPersisted {
        name: monitor.name.clone(),
    })?;
    Ok(NewAlert {
        title: title(monitor, now),
        level: monitor.alert_level,
        monitor: id,
        sink: monitor.last_active_sink.clone(),
        record_id: monitor.last_saved_record_id.clone(),
    })
}

/// Persist a new alert for `monitor` and record it on the monitor.
///
/// The monitor's alert bookkeeping is written only after the store has
/// accepted the alert; persisting the monitor itself is left to the caller.
/// Every call creates a new alert.
pub async fn emit(
    monitor: &mut Monitor,
    alerts: &dyn AlertStore,
    now: DateTime<Utc>,
) -> Result<Alert, MonitorError> {
    let alert = alerts
        .create(new_alert(monitor, now)?)
        .await
        .map_err(MonitorError::AlertPersistenceFailed)?;

    monitor.last_alert_at = Some(alert.created_at);
    monitor.last_alert_id = Some(alert.id);

    info!(
        monitor = %monitor.name,
        alert = %alert.id,
        level = %alert.level,
        "{}", alert.title
    );
    Ok(alert)
}
