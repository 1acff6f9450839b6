//! # sinkwatch
//!
//! Health monitoring for data sinks. A monitor watches one or more sinks and
//! turns unhealthy when none of them has received a record for longer than
//! its interval. Unhealthy monitors raise alerts, once per outage or once per
//! interval for monitors with repeating alerts.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          Watchdog                             │
//! │  ┌─────────┐    ┌───────────┐    ┌────────┐    ┌─────────┐   │
//! │  │ scanner │───▶│ evaluator │───▶│ policy │───▶│ emitter │   │
//! │  └────┬────┘    └───────────┘    └────────┘    └────┬────┘   │
//! │       │                                             │        │
//! │       ▼                                             ▼        │
//! │  ┌─────────┐                               ┌──────────────┐  │
//! │  │  Sink   │◀── MemorySink | JsonlSink     │ MonitorStore │  │
//! │  └─────────┘                               │  AlertStore  │  │
//! │                                            └──────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`engine`]**: [`Watchdog`] and the four evaluation stages
//! - **[`store`]**: persistence traits with in-memory and file-backed
//!   implementations
//! - **[`sweep`]**: concurrent evaluation of every enabled monitor
//! - **[`config`]**: TOML configuration and monitor reconciliation
//! - **[`clock`]**: the time source everything reads "now" from
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Evaluate every enabled monitor once
//! sinkwatch --config sinkwatch.toml check
//!
//! # Keep evaluating every minute
//! sinkwatch watch --every 1m
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use sinkwatch::{ManualClock, MemoryAlertStore, MemoryMonitorStore, Watchdog};
//! use sinkwatch::adapters::{MemorySink, SinkRegistry};
//! use sinkwatch::types::{Interval, Monitor, Status};
//!
//! # tokio_test::block_on(async {
//! let start = Utc::now();
//! let clock = Arc::new(ManualClock::new(start));
//! let watchdog = Watchdog::new(
//!     SinkRegistry::new().with(Arc::new(MemorySink::new("dns", Some("timestamp")))),
//!     Arc::new(MemoryMonitorStore::new(clock.clone())),
//!     Arc::new(MemoryAlertStore::new(clock.clone())),
//!     clock.clone(),
//! );
//!
//! let mut monitor = Monitor::builder("dns-feed", start)
//!     .watch("dns")
//!     .interval(Interval::seconds(60))
//!     .build();
//! watchdog.save(&mut monitor).await.unwrap();
//!
//! clock.advance(Duration::seconds(61));
//! let update = watchdog.update(&mut monitor).await.unwrap();
//! assert_eq!(update.status, Status::Unhealthy);
//! assert!(update.alert.is_some());
//! # });
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod store;
pub mod sweep;

pub use sinkwatch_adapters as adapters;
pub use sinkwatch_types as types;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, Settings};
pub use engine::{StatusUpdate, Watchdog};
pub use error::MonitorError;
pub use store::{
    AlertStore, JsonFileMonitorStore, JsonlAlertStore, MemoryAlertStore, MemoryMonitorStore,
    MonitorStore, StoreError,
};
pub use sweep::{MonitorOutcome, SweepReport};
