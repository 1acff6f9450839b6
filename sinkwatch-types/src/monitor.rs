//! Monitor - watches sinks for recent writes.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::{AlertId, AlertLevel, Interval, MonitorId, SinkId, Status};

/// A monitor watches one or more sinks and turns unhealthy when none of them
/// has seen a write for longer than `interval`.
///
/// The definitional fields (`name` through `alert_level`) are set by whoever
/// configures the monitor. The remaining fields are bookkeeping maintained by
/// the evaluation engine and the store; callers should not set them directly.
///
/// # Example
///
/// ```rust
/// use sinkwatch_types::{Interval, Monitor};
/// use chrono::Utc;
///
/// let monitor = Monitor::builder("dns-feed", Utc::now())
///     .watch("dns")
///     .interval(Interval::seconds(60))
///     .repeating_alerts(true)
///     .build();
///
/// assert!(monitor.is_new());
/// assert_eq!(monitor.to_string(), "dns-feed");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Monitor {
    /// Assigned by the store on first save.
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<MonitorId>,

    pub name: String,

    /// Disabled monitors are left out of sweeps.
    pub enabled: bool,

    /// If false the monitor never raises alerts, whatever its status.
    pub alerts_enabled: bool,

    /// If true the monitor re-alerts every interval while unhealthy,
    /// otherwise only on the transition into unhealthy.
    pub repeating_alerts: bool,

    pub watched_sinks: BTreeSet<SinkId>,

    pub interval: Interval,

    pub alert_level: AlertLevel,

    pub status: Status,

    pub created_at: DateTime<Utc>,

    /// Stamped by the store on every successful save.
    #[cfg_attr(feature = "serde", serde(default))]
    pub updated_at: Option<DateTime<Utc>>,

    /// Date of the newest record seen across the watched sinks.
    #[cfg_attr(feature = "serde", serde(default))]
    pub last_healthy_at: Option<DateTime<Utc>>,

    /// Sink that produced the newest record.
    #[cfg_attr(feature = "serde", serde(default))]
    pub last_active_sink: Option<SinkId>,

    /// Id of the newest record.
    #[cfg_attr(feature = "serde", serde(default))]
    pub last_saved_record_id: Option<String>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub last_alert_at: Option<DateTime<Utc>>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub last_alert_id: Option<AlertId>,

    /// Optimistic concurrency token, bumped by the store on every save.
    #[cfg_attr(feature = "serde", serde(default))]
    pub revision: u64,
}

impl Monitor {
    /// Create a builder for a monitor created at `created_at`.
    pub fn builder(name: impl Into<String>, created_at: DateTime<Utc>) -> MonitorBuilder {
        MonitorBuilder::new(name, created_at)
    }

    /// True until the monitor has been persisted once.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// The interval in compact form, e.g. `"15m"`.
    pub fn interval_label(&self) -> String {
        self.interval.to_string()
    }

    /// Whether this monitor watches the given sink.
    pub fn watches(&self, sink: &SinkId) -> bool {
        self.watched_sinks.contains(sink)
    }

    /// Start of the inactivity window: the last observed write, or the
    /// creation time if nothing has been observed yet.
    pub fn activity_baseline(&self) -> DateTime<Utc> {
        self.last_healthy_at.unwrap_or(self.created_at)
    }
}

impl fmt::Display for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builder for constructing `Monitor` instances.
#[derive(Debug)]
pub struct MonitorBuilder {
    monitor: Monitor,
}

impl MonitorBuilder {
    /// Create a new builder with default settings: enabled, alerts on,
    /// non-repeating, a one hour interval and medium severity.
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            monitor: Monitor {
                id: None,
                name: name.into(),
                enabled: true,
                alerts_enabled: true,
                repeating_alerts: false,
                watched_sinks: BTreeSet::new(),
                interval: Interval::new(1, crate::TimeUnit::Hours),
                alert_level: AlertLevel::default(),
                status: Status::Healthy,
                created_at,
                updated_at: None,
                last_healthy_at: None,
                last_active_sink: None,
                last_saved_record_id: None,
                last_alert_at: None,
                last_alert_id: None,
                revision: 0,
            },
        }
    }

    /// Add a sink to watch.
    pub fn watch(mut self, sink: impl Into<SinkId>) -> Self {
        self.monitor.watched_sinks.insert(sink.into());
        self
    }

    /// Set the maximum allowed silence.
    pub fn interval(mut self, interval: Interval) -> Self {
        self.monitor.interval = interval;
        self
    }

    /// Set the severity of raised alerts.
    pub fn alert_level(mut self, level: AlertLevel) -> Self {
        self.monitor.alert_level = level;
        self
    }

    /// Include or exclude the monitor from sweeps.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.monitor.enabled = enabled;
        self
    }

    /// Allow or forbid alerts.
    pub fn alerts_enabled(mut self, enabled: bool) -> Self {
        self.monitor.alerts_enabled = enabled;
        self
    }

    /// Re-alert every interval while unhealthy.
    pub fn repeating_alerts(mut self, repeating: bool) -> Self {
        self.monitor.repeating_alerts = repeating;
        self
    }

    /// Build the monitor.
    pub fn build(self) -> Monitor {
        self.monitor
    }
}
