//! Health status computation.
//!
//! Status is a pure function of the monitor's activity baseline (last
//! observed write, or creation time), its interval, and the evaluation time.

use chrono::{DateTime, Duration, Utc};

use sinkwatch_types::{format_downtime, Monitor, Status};

/// The outcome of evaluating one monitor at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// Time since the activity baseline.
    pub inactive: Duration,
    /// The monitor's interval.
    pub interval: Duration,
    pub status: Status,
}

impl Evaluation {
    /// Strictly longer silence than the interval allows.
    pub fn is_overdue(&self) -> bool {
        self.inactive > self.interval
    }

    /// The inactive time as shown in alert titles, e.g. `"1 m"`.
    pub fn downtime(&self) -> String {
        format_downtime(self.inactive.num_seconds())
    }
}

/// Time since the monitor last saw activity, measured at `now`.
pub fn inactive_for(monitor: &Monitor, now: DateTime<Utc>) -> Duration {
    now - monitor.activity_baseline()
}

/// Evaluate a monitor without modifying it.
pub fn evaluate(monitor: &Monitor, now: DateTime<Utc>) -> Evaluation {
    let inactive = inactive_for(monitor, now);
    let interval = monitor.interval.as_duration();
    let status = if inactive > interval {
        Status::Unhealthy
    } else {
        Status::Healthy
    };
    Evaluation {
        inactive,
        interval,
        status,
    }
}

/// Evaluate a monitor and store the resulting status on it.
pub fn apply(monitor: &mut Monitor, now: DateTime<Utc>) -> Status {
    let status = evaluate(monitor, now).status;
    monitor.status = status;
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sinkwatch_types::Interval;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn monitor(interval_secs: u32) -> Monitor {
        Monitor::builder("feed", t0())
            .interval(Interval::seconds(interval_secs))
            .build()
    }

    #[test]
    fn fresh_monitor_is_healthy_within_interval() {
        let m = monitor(60);
        for secs in [0, 1, 30, 59, 60] {
            let eval = evaluate(&m, t0() + Duration::seconds(secs));
            assert_eq!(eval.status, Status::Healthy, "at +{}s", secs);
        }
    }

    #[test]
    fn exactly_the_interval_is_still_healthy() {
        let m = monitor(60);
        let eval = evaluate(&m, t0() + Duration::seconds(60));
        assert!(!eval.is_overdue());
        assert_eq!(eval.status, Status::Healthy);
    }

    #[test]
    fn any_time_past_the_interval_is_unhealthy() {
        let m = monitor(60);
        let eval = evaluate(&m, t0() + Duration::milliseconds(60_001));
        assert!(eval.is_overdue());
        assert_eq!(eval.status, Status::Unhealthy);
    }

    #[test]
    fn last_activity_takes_precedence_over_creation() {
        let mut m = monitor(60);
        m.last_healthy_at = Some(t0() + Duration::seconds(100));

        let eval = evaluate(&m, t0() + Duration::seconds(150));
        assert_eq!(eval.inactive, Duration::seconds(50));
        assert_eq!(eval.status, Status::Healthy);

        let eval = evaluate(&m, t0() + Duration::seconds(161));
        assert_eq!(eval.status, Status::Unhealthy);
    }

    #[test]
    fn apply_overwrites_status() {
        let mut m = monitor(60);
        assert_eq!(apply(&mut m, t0() + Duration::seconds(61)), Status::Unhealthy);
        assert_eq!(m.status, Status::Unhealthy);
        m.last_healthy_at = Some(t0() + Duration::seconds(60));
        assert_eq!(apply(&mut m, t0() + Duration::seconds(61)), Status::Healthy);
        assert_eq!(m.status, Status::Healthy);
    }

    #[test]
    fn downtime_rounds_down() {
        let m = monitor(60);
        assert_eq!(evaluate(&m, t0() + Duration::seconds(61)).downtime(), "1 m");
        assert_eq!(evaluate(&m, t0() + Duration::seconds(95)).downtime(), "1 m");
        assert_eq!(evaluate(&m, t0() + Duration::hours(50)).downtime(), "2 d");
    }

    #[test]
    fn future_activity_is_not_overdue() {
        let mut m = monitor(60);
        m.last_healthy_at = Some(t0() + Duration::hours(1));
        let eval = evaluate(&m, t0());
        assert!(eval.inactive < Duration::zero());
        assert_eq!(eval.status, Status::Healthy);
        assert_eq!(eval.downtime(), "0 s");
    }
}
