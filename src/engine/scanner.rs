//! Activity scanning across watched sinks.
//!
//! Each watched sink is asked for its newest record since the query start.
//! The queries run concurrently and their answers are reduced with
//! [`Activity::latest`], which is commutative and associative, so the result
//! does not depend on the order sinks are visited or answer in.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;
use tracing::{debug, warn};

use sinkwatch_adapters::{record_id, Sink, SinkRegistry};
use sinkwatch_types::{Monitor, SinkId};

use crate::MonitorError;

/// The newest record observed in one sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub at: DateTime<Utc>,
    pub sink: SinkId,
    pub record_id: Option<String>,
}

impl Activity {
    fn rank(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then_with(|| self.sink.cmp(&other.sink))
            .then_with(|| self.record_id.cmp(&other.record_id))
    }

    /// The later of two observations.
    ///
    /// Ties on the date are broken by sink id, then record id, which keeps
    /// the reduction independent of argument order.
    pub fn latest(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if a.rank(&b) == Ordering::Less { b } else { a }),
            (a, None) => a,
            (None, b) => b,
        }
    }

    /// Record this activity on `monitor` if it is strictly newer than the
    /// monitor's last observed activity. Returns whether anything changed.
    ///
    /// `last_healthy_at` therefore never moves backwards.
    pub fn apply_to(self, monitor: &mut Monitor) -> bool {
        if monitor.last_healthy_at.is_some_and(|last| self.at <= last) {
            return false;
        }
        monitor.last_healthy_at = Some(self.at);
        monitor.last_active_sink = Some(self.sink);
        monitor.last_saved_record_id = self.record_id;
        true
    }
}

/// Start of the monitoring interval ending at `now`, clamped to the earliest
/// representable time for intervals reaching further back.
pub fn interval_start(monitor: &Monitor, now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::seconds(monitor.interval.as_seconds()))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Earliest record date a scan is interested in.
///
/// The last observed activity if it falls inside the current interval,
/// otherwise the interval start. Scans never reach further back than one
/// interval.
pub fn query_start(monitor: &Monitor, now: DateTime<Utc>) -> DateTime<Utc> {
    let start = interval_start(monitor, now);
    match monitor.last_healthy_at {
        Some(last) if last >= start => last,
        _ => start,
    }
}

/// Query every watched sink and return the newest activity found.
///
/// Sinks that are not registered or have no searchable date field are
/// skipped. Query failures other than connectivity loss count as "nothing
/// found". Connectivity loss fails the whole scan; `monitor` is never
/// modified here either way.
pub async fn scan(
    monitor: &Monitor,
    sinks: &SinkRegistry,
    now: DateTime<Utc>,
) -> Result<Option<Activity>, MonitorError> {
    let after = query_start(monitor, now);

    let queries = monitor.watched_sinks.iter().filter_map(|id| match sinks.get(id) {
        Some(sink) => Some(latest_in(sink, after)),
        None => {
            warn!(monitor = %monitor.name, sink = %id, "Watched sink is not registered, skipping");
            None
        }
    });

    join_all(queries)
        .await
        .into_iter()
        .try_fold(None, |best, found| Ok(Activity::latest(best, found?)))
}

/// Scan and record any newer activity on `monitor`.
///
/// Returns whether the monitor's activity fields changed. On error the
/// monitor is left exactly as it was.
pub async fn refresh_activity(
    monitor: &mut Monitor,
    sinks: &SinkRegistry,
    now: DateTime<Utc>,
) -> Result<bool, MonitorError> {
    let found = scan(monitor, sinks, now).await?;
    Ok(found.is_some_and(|activity| activity.apply_to(monitor)))
}

async fn latest_in(
    sink: Arc<dyn Sink>,
    after: DateTime<Utc>,
) -> Result<Option<Activity>, MonitorError> {
    let Some(date_field) = sink.searchable_date_field() else {
        debug!(sink = %sink.id(), "Sink has no searchable date field, skipping");
        return Ok(None);
    };

    let doc = match sink.find_most_recent(after, date_field).await {
        Ok(doc) => doc,
        Err(e) if e.is_fatal() => {
            return Err(MonitorError::SinkUnavailable {
                sink: sink.id().clone(),
                source: e,
            })
        }
        Err(e) => {
            warn!(sink = %sink.id(), error = %e, "Sink query failed, treating as no activity");
            return Ok(None);
        }
    };

    let Some(doc) = doc else {
        debug!(sink = %sink.id(), after = %after, "No records since query start");
        return Ok(None);
    };

    let Some(at) = sink.date_of(&doc) else {
        warn!(sink = %sink.id(), "Newest record has no readable date, ignoring");
        return Ok(None);
    };

    debug!(sink = %sink.id(), at = %at, "Found recent record");
    Ok(Some(Activity {
        at,
        sink: sink.id().clone(),
        record_id: record_id(&doc),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use sinkwatch_adapters::{MemorySink, SinkError};
    use sinkwatch_types::Interval;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    fn activity(secs: i64, sink: &str, id: &str) -> Activity {
        Activity {
            at: at(secs),
            sink: SinkId::from(sink),
            record_id: Some(id.to_string()),
        }
    }

    fn sink_with(name: &str, records: &[(&str, i64)]) -> Arc<MemorySink> {
        let sink = Arc::new(MemorySink::new(name, Some("timestamp")));
        for (id, secs) in records {
            sink.push(json!({"_id": id, "timestamp": at(*secs).to_rfc3339()}));
        }
        sink
    }

    fn monitor(sinks: &[&str]) -> Monitor {
        let mut builder = Monitor::builder("feed", t0()).interval(Interval::seconds(60));
        for s in sinks {
            builder = builder.watch(*s);
        }
        builder.build()
    }

    #[test]
    fn latest_is_order_independent() {
        let a = Some(activity(10, "a", "1"));
        let b = Some(activity(5, "b", "2"));
        let c = Some(activity(10, "c", "3"));

        assert_eq!(Activity::latest(a.clone(), b.clone()), a);
        assert_eq!(Activity::latest(b.clone(), a.clone()), a);
        // Equal dates: the tie-break picks the same winner both ways.
        assert_eq!(Activity::latest(a.clone(), c.clone()), c);
        assert_eq!(Activity::latest(c.clone(), a.clone()), c);
        // Associative.
        assert_eq!(
            Activity::latest(Activity::latest(a.clone(), b.clone()), c.clone()),
            Activity::latest(a.clone(), Activity::latest(b.clone(), c.clone()))
        );
        assert_eq!(Activity::latest(None, b.clone()), b);
        assert_eq!(Activity::latest(None, None), None);
    }

    #[test]
    fn apply_never_moves_backwards() {
        let mut m = monitor(&["a"]);
        assert!(activity(20, "a", "x").apply_to(&mut m));
        assert!(!activity(10, "a", "y").apply_to(&mut m));
        assert!(!activity(20, "b", "z").apply_to(&mut m));
        assert_eq!(m.last_healthy_at, Some(at(20)));
        assert_eq!(m.last_saved_record_id.as_deref(), Some("x"));

        assert!(activity(21, "b", "w").apply_to(&mut m));
        assert_eq!(m.last_active_sink, Some(SinkId::from("b")));
    }

    #[test]
    fn query_start_is_bounded_by_interval() {
        let mut m = monitor(&["a"]);
        let now = at(1_000);

        // Nothing seen yet: the interval start.
        assert_eq!(query_start(&m, now), at(940));

        // Seen inside the interval: resume from there.
        m.last_healthy_at = Some(at(970));
        assert_eq!(query_start(&m, now), at(970));

        // Exactly at the interval start counts as inside.
        m.last_healthy_at = Some(at(940));
        assert_eq!(query_start(&m, now), at(940));

        // Seen long ago: do not scan back that far.
        m.last_healthy_at = Some(at(10));
        assert_eq!(query_start(&m, now), at(940));
    }

    #[tokio::test]
    async fn huge_interval_scans_from_the_beginning_of_time() {
        let interval: Interval = "100000000d".parse().unwrap();
        let mut m = monitor(&["a"]);
        m.interval = interval;

        assert_eq!(interval_start(&m, at(0)), DateTime::<Utc>::MIN_UTC);
        assert_eq!(query_start(&m, at(0)), DateTime::<Utc>::MIN_UTC);

        let registry = SinkRegistry::new().with(sink_with("a", &[("ancient", -86_400)]));
        assert!(refresh_activity(&mut m, &registry, at(0)).await.unwrap());
        assert_eq!(m.last_saved_record_id.as_deref(), Some("ancient"));
    }

    #[tokio::test]
    async fn newest_record_across_sinks_wins() {
        let a = sink_with("a", &[("a1", 3), ("a2", 10)]);
        let b = sink_with("b", &[("b1", 5)]);
        let registry = SinkRegistry::new().with(a).with(b);
        let mut m = monitor(&["a", "b"]);

        let changed = refresh_activity(&mut m, &registry, at(30)).await.unwrap();

        assert!(changed);
        assert_eq!(m.last_active_sink, Some(SinkId::from("a")));
        assert_eq!(m.last_healthy_at, Some(at(10)));
        assert_eq!(m.last_saved_record_id.as_deref(), Some("a2"));
    }

    #[tokio::test]
    async fn records_older_than_interval_are_not_found() {
        let a = sink_with("a", &[("old", 5)]);
        let registry = SinkRegistry::new().with(a);
        let m = monitor(&["a"]);

        assert_eq!(scan(&m, &registry, at(100)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn skips_unregistered_and_undated_sinks() {
        let undated = Arc::new(MemorySink::new("undated", None));
        undated.push(json!({"_id": "u", "timestamp": at(20).to_rfc3339()}));
        let a = sink_with("a", &[("a1", 10)]);
        let registry = SinkRegistry::new().with(undated.clone()).with(a);
        let m = monitor(&["a", "undated", "ghost"]);

        let found = scan(&m, &registry, at(30)).await.unwrap().unwrap();
        assert_eq!(found.sink, SinkId::from("a"));
        assert_eq!(undated.query_count(), 0);
    }

    #[tokio::test]
    async fn non_fatal_failures_count_as_no_activity() {
        let a = sink_with("a", &[("a1", 10)]);
        let b = sink_with("b", &[("b1", 20)]);
        b.fail_with(Some(SinkError::Timeout));
        let registry = SinkRegistry::new().with(a).with(b);
        let m = monitor(&["a", "b"]);

        let found = scan(&m, &registry, at(30)).await.unwrap().unwrap();
        assert_eq!(found.sink, SinkId::from("a"));
    }

    #[tokio::test]
    async fn unavailable_sink_fails_without_touching_monitor() {
        let a = sink_with("a", &[("a1", 10)]);
        let b = sink_with("b", &[]);
        b.fail_with(Some(SinkError::Unavailable("connection refused".into())));
        let registry = SinkRegistry::new().with(a).with(b);
        let mut m = monitor(&["a", "b"]);
        let before = m.clone();

        let err = refresh_activity(&mut m, &registry, at(30)).await.unwrap_err();

        assert!(matches!(
            err,
            MonitorError::SinkUnavailable { ref sink, .. } if sink.as_str() == "b"
        ));
        assert_eq!(m, before);
    }

    #[tokio::test]
    async fn rescanning_resumes_after_last_activity() {
        let a = sink_with("a", &[("a1", 10)]);
        let registry = SinkRegistry::new().with(a.clone());
        let mut m = monitor(&["a"]);

        assert!(refresh_activity(&mut m, &registry, at(30)).await.unwrap());
        // The same record is not strictly after the new query start.
        assert!(!refresh_activity(&mut m, &registry, at(40)).await.unwrap());

        a.push(json!({"_id": "a2", "timestamp": at(35).to_rfc3339()}));
        assert!(refresh_activity(&mut m, &registry, at(40)).await.unwrap());
        assert_eq!(m.last_saved_record_id.as_deref(), Some("a2"));
    }
}
