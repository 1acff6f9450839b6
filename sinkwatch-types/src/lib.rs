//! # sinkwatch-types
//!
//! Core types for sinkwatch. A [`Monitor`] watches one or more data sinks
//! and turns unhealthy when none of them has seen a write for longer than its
//! [`Interval`]. When that happens it may raise an [`Alert`].
//!
//! This crate holds the data only. The evaluation engine lives in the
//! `sinkwatch` crate and the sink capability in `sinkwatch-adapters`.
//!
//! ## Features
//!
//! - `serde`: serialization of every type via serde (timestamps via chrono)
//!
//! ## Example
//!
//! ```rust
//! use sinkwatch_types::{AlertLevel, Interval, Monitor, Status, TimeUnit};
//! use chrono::{TimeZone, Utc};
//!
//! let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let monitor = Monitor::builder("firewall-feed", created)
//!     .watch("firewall")
//!     .watch("proxy")
//!     .interval(Interval::new(15, TimeUnit::Minutes))
//!     .alert_level(AlertLevel::High)
//!     .build();
//!
//! assert_eq!(monitor.interval.to_string(), "15m");
//! assert_eq!(monitor.status, Status::Healthy);
//! assert_eq!(monitor.watched_sinks.len(), 2);
//! ```

mod alert;
mod downtime;
mod ids;
mod interval;
mod monitor;
mod status;

pub use alert::*;
pub use downtime::*;
pub use ids::*;
pub use interval::*;
pub use monitor::*;
pub use status::*;
