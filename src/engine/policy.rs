//! Alert deduplication.
//!
//! A monitor alerts once when it goes unhealthy. Monitors with repeating
//! alerts also alert again every interval for as long as they stay
//! unhealthy.

use chrono::{DateTime, Utc};

use sinkwatch_types::{Monitor, Status};

/// Why the policy did or did not fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// The monitor has just turned unhealthy.
    pub status_changed: bool,
    /// No alert yet, or the last one is older than the interval.
    pub alert_due: bool,
    /// A repeat alert is owed to a monitor that is still unhealthy.
    pub repeat: bool,
    pub fire: bool,
}

impl Decision {
    const HOLD: Decision = Decision {
        status_changed: false,
        alert_due: false,
        repeat: false,
        fire: false,
    };
}

/// Whether enough time has passed since the monitor's last alert.
pub fn alert_due(monitor: &Monitor, now: DateTime<Utc>) -> bool {
    match monitor.last_alert_at {
        None => true,
        Some(last) => now - last > monitor.interval.as_duration(),
    }
}

/// Decide whether a status change from `old` to `new` warrants an alert.
///
/// Only unhealthy monitors alert. Reads the monitor's alert settings and its
/// last alert time but changes nothing.
pub fn decide(monitor: &Monitor, old: Status, new: Status, now: DateTime<Utc>) -> Decision {
    if new != Status::Unhealthy {
        return Decision::HOLD;
    }

    let status_changed = old != Status::Unhealthy;
    let alert_due = alert_due(monitor, now);
    let repeat = monitor.repeating_alerts && alert_due;

    Decision {
        status_changed,
        alert_due,
        repeat,
        fire: monitor.alerts_enabled && (repeat || status_changed),
    }
}

/// Shorthand for `decide(..).fire`.
pub fn should_alert(monitor: &Monitor, old: Status, new: Status, now: DateTime<Utc>) -> bool {
    decide(monitor, old, new, now).fire
}
