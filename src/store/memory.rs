//! In-memory stores.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use sinkwatch_types::{Alert, AlertId, Monitor, MonitorId, NewAlert};

use super::{AlertStore, MonitorStore, StoreError};
use crate::clock::Clock;

/// Monitors keyed by id, plus the id sequence.
///
/// Shared by the in-memory and file-backed monitor stores so both enforce
/// the same revision rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct MonitorTable {
    next_id: u64,
    #[serde(with = "monitor_list")]
    monitors: BTreeMap<MonitorId, Monitor>,
}

impl MonitorTable {
    /// Validate and apply a save, updating `monitor` in place on success.
    ///
    /// On error neither the table nor `monitor` is modified.
    pub(crate) fn apply_save(
        &mut self,
        monitor: &mut Monitor,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let id = match monitor.id {
            None => {
                if self.find_by_name(&monitor.name).is_some() {
                    return Err(StoreError::DuplicateName(monitor.name.clone()));
                }
                MonitorId(self.next_id.max(1))
            }
            Some(id) => {
                let stored = self.monitors.get(&id).ok_or(StoreError::NotFound(id))?;
                if stored.revision != monitor.revision {
                    return Err(StoreError::Conflict {
                        id,
                        expected: monitor.revision,
                        found: stored.revision,
                    });
                }
                if stored.name != monitor.name {
                    if let Some(other) = self.find_by_name(&monitor.name) {
                        if other.id != Some(id) {
                            return Err(StoreError::DuplicateName(monitor.name.clone()));
                        }
                    }
                }
                id
            }
        };

        if monitor.id.is_none() {
            self.next_id = id.0 + 1;
        }
        monitor.id = Some(id);
        monitor.revision += 1;
        monitor.updated_at = Some(now);
        self.monitors.insert(id, monitor.clone());
        Ok(())
    }

    pub(crate) fn get(&self, id: MonitorId) -> Option<&Monitor> {
        self.monitors.get(&id)
    }

    pub(crate) fn find_by_name(&self, name: &str) -> Option<&Monitor> {
        self.monitors.values().find(|m| m.name == name)
    }

    pub(crate) fn all(&self) -> Vec<Monitor> {
        self.monitors.values().cloned().collect()
    }
}

/// JSON maps need string keys, so the table is stored as a list.
mod monitor_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use sinkwatch_types::{Monitor, MonitorId};

    pub fn serialize<S: Serializer>(
        monitors: &BTreeMap<MonitorId, Monitor>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<&Monitor> = monitors.values().collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<MonitorId, Monitor>, D::Error> {
        let list = Vec::<Monitor>::deserialize(deserializer)?;
        list.into_iter()
            .map(|m| match m.id {
                Some(id) => Ok((id, m)),
                None => Err(serde::de::Error::custom(format!(
                    "stored monitor {:?} has no id",
                    m.name
                ))),
            })
            .collect()
    }
}

/// Monitor store held in process memory.
#[derive(Debug)]
pub struct MemoryMonitorStore {
    table: RwLock<MonitorTable>,
    clock: Arc<dyn Clock>,
}

impl MemoryMonitorStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            table: RwLock::new(MonitorTable::default()),
            clock,
        }
    }
}

#[async_trait]
impl MonitorStore for MemoryMonitorStore {
    async fn save(&self, monitor: &mut Monitor) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.table.write().apply_save(monitor, now)
    }

    async fn get(&self, id: MonitorId) -> Result<Option<Monitor>, StoreError> {
        Ok(self.table.read().get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Monitor>, StoreError> {
        Ok(self.table.read().find_by_name(name).cloned())
    }

    async fn all(&self) -> Result<Vec<Monitor>, StoreError> {
        Ok(self.table.read().all())
    }
}

/// Alert store held in process memory.
#[derive(Debug)]
pub struct MemoryAlertStore {
    alerts: RwLock<Vec<Alert>>,
    clock: Arc<dyn Clock>,
}

impl MemoryAlertStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            alerts: RwLock::new(Vec::new()),
            clock,
        }
    }

    /// Every alert created so far, oldest first.
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.read().clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.read().is_empty()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn create(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let mut alerts = self.alerts.write();
        let id = AlertId(alerts.len() as u64 + 1);
        let alert = Alert::from_new(id, self.clock.now(), alert);
        alerts.push(alert.clone());
        Ok(alert)
    }

    async fn list_for(&self, monitor: MonitorId) -> Result<Vec<Alert>, StoreError> {
        Ok(self
            .alerts
            .read()
            .iter()
            .filter(|a| a.monitor == monitor)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;
    use sinkwatch_types::{AlertLevel, SinkId};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn stores() -> (Arc<ManualClock>, MemoryMonitorStore, MemoryAlertStore) {
        let clock = Arc::new(ManualClock::new(start()));
        (
            clock.clone(),
            MemoryMonitorStore::new(clock.clone()),
            MemoryAlertStore::new(clock),
        )
    }

    #[tokio::test]
    async fn first_save_assigns_id_and_revision() {
        let (_, store, _) = stores();
        let mut monitor = Monitor::builder("feed", start()).build();

        store.save(&mut monitor).await.unwrap();

        assert_eq!(monitor.id, Some(MonitorId(1)));
        assert_eq!(monitor.revision, 1);
        assert_eq!(monitor.updated_at, Some(start()));
        assert_eq!(store.get(MonitorId(1)).await.unwrap(), Some(monitor));
    }

    #[tokio::test]
    async fn ids_are_sequential() {
        let (_, store, _) = stores();
        let mut a = Monitor::builder("a", start()).build();
        let mut b = Monitor::builder("b", start()).build();
        store.save(&mut a).await.unwrap();
        store.save(&mut b).await.unwrap();
        assert_eq!(b.id, Some(MonitorId(2)));
    }

    #[tokio::test]
    async fn stale_revision_conflicts_without_changes() {
        let (_, store, _) = stores();
        let mut monitor = Monitor::builder("feed", start()).build();
        store.save(&mut monitor).await.unwrap();

        let mut first = monitor.clone();
        let mut second = monitor.clone();
        first.alert_level = AlertLevel::High;
        store.save(&mut first).await.unwrap();

        second.alert_level = AlertLevel::Low;
        let err = store.save(&mut second).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: 1,
                found: 2,
                ..
            }
        ));
        assert_eq!(second.revision, 1);

        let stored = store.get(monitor.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.alert_level, AlertLevel::High);
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let (_, store, _) = stores();
        let mut a = Monitor::builder("feed", start()).build();
        let mut b = Monitor::builder("feed", start()).build();
        store.save(&mut a).await.unwrap();

        let err = store.save(&mut b).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(name) if name == "feed"));
        assert!(b.id.is_none());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let (_, store, _) = stores();
        let mut monitor = Monitor::builder("feed", start()).build();
        monitor.id = Some(MonitorId(99));
        let err = store.save(&mut monitor).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(MonitorId(99))));
    }

    #[tokio::test]
    async fn finders_filter_enabled_and_watching() {
        let (_, store, _) = stores();
        let mut dns = Monitor::builder("dns", start()).watch("dns").build();
        let mut both = Monitor::builder("both", start())
            .watch("dns")
            .watch("proxy")
            .build();
        let mut off = Monitor::builder("off", start())
            .watch("dns")
            .enabled(false)
            .build();
        for m in [&mut dns, &mut both, &mut off] {
            store.save(m).await.unwrap();
        }

        let enabled: Vec<_> = store
            .find_enabled()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(enabled, vec!["dns", "both"]);

        let watching: Vec<_> = store
            .find_watching(&SinkId::from("proxy"))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(watching, vec!["both"]);

        assert!(store.find_by_name("off").await.unwrap().is_some());
        assert_eq!(store.all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn alerts_get_ids_and_clock_time() {
        let (clock, _, alerts) = stores();
        let new = |monitor| NewAlert {
            title: "down".to_string(),
            level: AlertLevel::Medium,
            monitor: MonitorId(monitor),
            sink: None,
            record_id: None,
        };

        let first = alerts.create(new(1)).await.unwrap();
        clock.advance(chrono::Duration::seconds(5));
        let second = alerts.create(new(2)).await.unwrap();

        assert_eq!(first.id, AlertId(1));
        assert_eq!(first.created_at, start());
        assert_eq!(second.id, AlertId(2));
        assert_eq!(second.created_at, start() + chrono::Duration::seconds(5));
        assert_eq!(alerts.list_for(MonitorId(2)).await.unwrap(), vec![second]);
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn table_round_trips_through_json() {
        let mut table = MonitorTable::default();
        let mut monitor = Monitor::builder("feed", start()).watch("dns").build();
        table.apply_save(&mut monitor, start()).unwrap();

        let json = serde_json::to_string(&table).unwrap();
        let back: MonitorTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(MonitorId(1)), Some(&monitor));
        assert_eq!(back.next_id, 2);
    }
}
