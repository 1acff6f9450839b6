//! Configuration file loading.
//!
//! Settings come from a TOML file layered with `SINKWATCH__*` environment
//! variables, e.g. `SINKWATCH__LOG__FILTER=debug`. Relative paths in the file
//! are resolved against the file's directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use sinkwatch_adapters::{JsonlSink, SinkRegistry};
use sinkwatch_types::{AlertLevel, Interval, Monitor, ParseIntervalError, SinkId};

use crate::clock::Clock;
use crate::engine::Watchdog;
use crate::store::{JsonFileMonitorStore, JsonlAlertStore, StoreError};
use crate::MonitorError;

/// Default configuration file name.
pub const DEFAULT_CONFIG: &str = "sinkwatch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("monitor {monitor:?}: {source}")]
    InvalidInterval {
        monitor: String,
        #[source]
        source: ParseIntervalError,
    },

    #[error("monitor {monitor:?} watches unknown sink {sink:?}")]
    UnknownSink { monitor: String, sink: String },

    #[error("sink {0:?} is defined more than once")]
    DuplicateSink(String),

    #[error("monitor {0:?} is defined more than once")]
    DuplicateMonitor(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub state: StateSettings,
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub sinks: Vec<SinkSettings>,
    #[serde(default)]
    pub monitors: Vec<MonitorSettings>,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

/// Where monitors and alerts are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct StateSettings {
    #[serde(default = "default_monitors_path")]
    pub monitors: PathBuf,
    #[serde(default = "default_alerts_path")]
    pub alerts: PathBuf,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            monitors: default_monitors_path(),
            alerts: default_alerts_path(),
        }
    }
}

fn default_monitors_path() -> PathBuf {
    PathBuf::from("state/monitors.json")
}

fn default_alerts_path() -> PathBuf {
    PathBuf::from("state/alerts.jsonl")
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// A `tracing` filter directive, e.g. `"info,sinkwatch=debug"`.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

/// A JSON-lines file to watch.
#[derive(Debug, Clone, Deserialize)]
pub struct SinkSettings {
    pub name: String,
    pub path: PathBuf,
    /// Without a date field the sink is never queried.
    #[serde(default)]
    pub date_field: Option<String>,
}

/// A monitor definition.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSettings {
    pub name: String,
    #[serde(default)]
    pub sinks: Vec<String>,
    pub interval: String,
    #[serde(default)]
    pub alert_level: AlertLevel,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default = "enabled")]
    pub alerts_enabled: bool,
    #[serde(default)]
    pub repeating_alerts: bool,
}

fn enabled() -> bool {
    true
}

impl MonitorSettings {
    fn interval(&self) -> Result<Interval, ConfigError> {
        self.interval
            .parse()
            .map_err(|source| ConfigError::InvalidInterval {
                monitor: self.name.clone(),
                source,
            })
    }

    /// Copy the definition onto `monitor`, leaving its bookkeeping alone.
    /// Returns whether anything changed.
    fn apply_to(&self, monitor: &mut Monitor) -> Result<bool, ConfigError> {
        let watched: BTreeSet<SinkId> = self
            .sinks
            .iter()
            .map(|s| SinkId::from(s.as_str()))
            .collect();
        let interval = self.interval()?;

        let changed = monitor.enabled != self.enabled
            || monitor.alerts_enabled != self.alerts_enabled
            || monitor.repeating_alerts != self.repeating_alerts
            || monitor.watched_sinks != watched
            || monitor.interval != interval
            || monitor.alert_level != self.alert_level;

        monitor.enabled = self.enabled;
        monitor.alerts_enabled = self.alerts_enabled;
        monitor.repeating_alerts = self.repeating_alerts;
        monitor.watched_sinks = watched;
        monitor.interval = interval;
        monitor.alert_level = self.alert_level;
        Ok(changed)
    }
}

/// What [`Settings::reconcile`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub inserted: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
}

impl Settings {
    /// Load settings from `path` and the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut settings: Settings = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("SINKWATCH").separator("__"))
            .build()?
            .try_deserialize()?;
        settings.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        settings.validate()?;
        debug!(
            path = %path.display(),
            sinks = settings.sinks.len(),
            monitors = settings.monitors.len(),
            "Loaded configuration"
        );
        Ok(settings)
    }

    /// Check names are unique, sinks exist and intervals parse.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut sinks = BTreeSet::new();
        for sink in &self.sinks {
            if !sinks.insert(sink.name.as_str()) {
                return Err(ConfigError::DuplicateSink(sink.name.clone()));
            }
        }

        let mut monitors = BTreeSet::new();
        for monitor in &self.monitors {
            if !monitors.insert(monitor.name.as_str()) {
                return Err(ConfigError::DuplicateMonitor(monitor.name.clone()));
            }
            monitor.interval()?;
            if let Some(sink) = monitor.sinks.iter().find(|s| !sinks.contains(s.as_str())) {
                return Err(ConfigError::UnknownSink {
                    monitor: monitor.name.clone(),
                    sink: sink.clone(),
                });
            }
        }
        Ok(())
    }

    /// Resolve a configured path against the configuration file's directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// One [`JsonlSink`] per configured sink.
    pub fn registry(&self) -> SinkRegistry {
        self.sinks.iter().fold(SinkRegistry::new(), |registry, sink| {
            registry.with(Arc::new(JsonlSink::new(
                sink.name.as_str(),
                self.resolve(&sink.path),
                sink.date_field.as_deref(),
            )))
        })
    }

    /// Open the state files and build a watchdog over the configured sinks.
    pub async fn watchdog(&self, clock: Arc<dyn Clock>) -> Result<Watchdog, ConfigError> {
        let monitors =
            JsonFileMonitorStore::open(self.resolve(&self.state.monitors), clock.clone()).await?;
        let alerts = JsonlAlertStore::open(self.resolve(&self.state.alerts), clock.clone()).await?;
        Ok(Watchdog::new(
            self.registry(),
            Arc::new(monitors),
            Arc::new(alerts),
            clock,
        ))
    }

    /// Bring stored monitors in line with the configured definitions.
    ///
    /// Matches by name. New monitors are created; existing ones keep their
    /// status, activity and alert history. Stored monitors missing from the
    /// configuration are left as they are.
    pub async fn reconcile(&self, watchdog: &Watchdog) -> Result<Reconciled, ConfigError> {
        let mut report = Reconciled::default();
        let now = watchdog.clock().now();

        for def in &self.monitors {
            match watchdog.monitors().find_by_name(&def.name).await? {
                Some(mut monitor) => {
                    if def.apply_to(&mut monitor)? {
                        watchdog.save(&mut monitor).await?;
                        info!(monitor = %def.name, "Updated monitor definition");
                        report.updated.push(def.name.clone());
                    } else {
                        report.unchanged.push(def.name.clone());
                    }
                }
                None => {
                    let mut monitor = Monitor::builder(def.name.as_str(), now).build();
                    def.apply_to(&mut monitor)?;
                    watchdog.save(&mut monitor).await?;
                    info!(monitor = %def.name, interval = %monitor.interval, "Created monitor");
                    report.inserted.push(def.name.clone());
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use sinkwatch_types::{Status, TimeUnit};

    const SAMPLE: &str = r#"
[state]
monitors = "state/monitors.json"
alerts = "state/alerts.jsonl"

[log]
filter = "debug"

[[sinks]]
name = "firewall"
path = "data/firewall.jsonl"
date_field = "timestamp"

[[sinks]]
name = "proxy"
path = "data/proxy.jsonl"

[[monitors]]
name = "firewall-feed"
sinks = ["firewall", "proxy"]
interval = "15m"
alert_level = "HIGH"

[[monitors]]
name = "proxy-feed"
sinks = ["proxy"]
interval = "1h"
enabled = false
repeating_alerts = true
"#;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("sinkwatch.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn parses_sample() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(write_config(dir.path(), SAMPLE)).unwrap();

        assert_eq!(settings.log.filter, "debug");
        assert_eq!(settings.sinks.len(), 2);
        assert_eq!(settings.sinks[1].date_field, None);

        let feed = &settings.monitors[0];
        assert_eq!(feed.alert_level, AlertLevel::High);
        assert!(feed.enabled);
        assert!(feed.alerts_enabled);
        assert!(!feed.repeating_alerts);
        assert_eq!(feed.interval().unwrap(), Interval::new(15, TimeUnit::Minutes));

        let proxy = &settings.monitors[1];
        assert!(!proxy.enabled);
        assert!(proxy.repeating_alerts);
        assert_eq!(proxy.alert_level, AlertLevel::Medium);

        assert_eq!(
            settings.resolve(&settings.state.monitors),
            dir.path().join("state/monitors.json")
        );
        assert_eq!(settings.registry().len(), 2);
    }

    #[test]
    fn defaults_without_sections() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(write_config(dir.path(), "")).unwrap();
        assert_eq!(settings.log.filter, "info");
        assert_eq!(settings.state.alerts, PathBuf::from("state/alerts.jsonl"));
        assert!(settings.monitors.is_empty());
    }

    #[test]
    fn rejects_unknown_sink() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"
[[monitors]]
name = "feed"
sinks = ["nowhere"]
interval = "5m"
"#;
        let err = Settings::load(write_config(dir.path(), body)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSink { ref sink, .. } if sink == "nowhere"));
    }

    #[test]
    fn rejects_bad_interval_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"
[[monitors]]
name = "feed"
interval = "5 weeks"
"#;
        let err = Settings::load(write_config(dir.path(), body)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterval { .. }));

        let body = r#"
[[sinks]]
name = "a"
path = "a.jsonl"

[[sinks]]
name = "a"
path = "b.jsonl"
"#;
        let err = Settings::load(write_config(dir.path(), body)).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSink(name) if name == "a"));
    }

    #[tokio::test]
    async fn reconcile_inserts_then_updates_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), SAMPLE);
        let clock = clock();

        let settings = Settings::load(&path).unwrap();
        let watchdog = settings.watchdog(clock.clone()).await.unwrap();
        let report = settings.reconcile(&watchdog).await.unwrap();
        assert_eq!(report.inserted, vec!["firewall-feed", "proxy-feed"]);

        // Simulate an outage recorded against the stored monitor.
        let mut stored = watchdog.monitors().find_by_name("firewall-feed").await.unwrap().unwrap();
        clock.advance(chrono::Duration::minutes(16));
        watchdog.update(&mut stored).await.unwrap();
        assert_eq!(stored.status, Status::Unhealthy);
        assert!(stored.last_alert_id.is_some());

        // Reload with a changed level against the same state files.
        std::fs::write(&path, SAMPLE.replace("\"HIGH\"", "\"CRITICAL\"")).unwrap();
        let settings = Settings::load(&path).unwrap();
        let watchdog = settings.watchdog(clock.clone()).await.unwrap();
        let report = settings.reconcile(&watchdog).await.unwrap();
        assert_eq!(report.updated, vec!["firewall-feed"]);
        assert_eq!(report.unchanged, vec!["proxy-feed"]);

        let reloaded = watchdog.monitors().find_by_name("firewall-feed").await.unwrap().unwrap();
        assert_eq!(reloaded.alert_level, AlertLevel::Critical);
        assert_eq!(reloaded.id, stored.id);
        assert_eq!(reloaded.last_alert_id, stored.last_alert_id);
        assert_eq!(reloaded.created_at, stored.created_at);
    }
}
