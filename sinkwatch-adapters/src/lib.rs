//! # sinkwatch-adapters
//!
//! The sink capability sinkwatch monitors query, plus ready-to-use sinks.
//!
//! A sink is anything records get written to. A monitor asks each of its
//! sinks a single question: "what is your newest record after time T?"
//! The [`Sink`] trait captures that, and [`SinkRegistry`] maps the sink names
//! monitors use to the sinks themselves.
//!
//! ## Supported Sinks
//!
//! - **Memory** ([`MemorySink`]) - records held in process
//! - **JSON lines** (`jsonl` feature, on by default) - one JSON object per
//!   line in a file
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use sinkwatch_adapters::{MemorySink, SinkRegistry};
//! use sinkwatch_types::SinkId;
//!
//! let registry = SinkRegistry::new()
//!     .with(Arc::new(MemorySink::new("dns", Some("timestamp"))));
//!
//! assert!(registry.contains(&SinkId::from("dns")));
//! ```

pub mod error;
pub mod memory;
pub mod registry;
pub mod sink;

#[cfg(feature = "jsonl")]
pub mod jsonl;

pub use error::SinkError;
pub use memory::MemorySink;
pub use registry::SinkRegistry;
pub use sink::{record_id, Document, Sink};

#[cfg(feature = "jsonl")]
pub use jsonl::JsonlSink;

// Re-export types for convenience
pub use sinkwatch_types::SinkId;
