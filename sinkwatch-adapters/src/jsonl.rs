//! Newline-delimited JSON file sink.
//!
//! Treats a file of one JSON object per line as a sink. Writers append
//! records; sinkwatch reads the whole file on every query, so this suits
//! modest files such as rotated application logs.
//!
//! ## Behavior
//!
//! - A missing file is an empty sink, not an error
//! - Any other I/O failure is [`SinkError::Unavailable`]
//! - Lines that are blank, not JSON, or not objects are skipped
//!
//! ## Example
//!
//! ```rust,no_run
//! use sinkwatch_adapters::{JsonlSink, Sink};
//!
//! # tokio_test::block_on(async {
//! let sink = JsonlSink::new("firewall", "/var/log/firewall.jsonl", Some("timestamp"));
//! let doc = sink.find_by_id("evt-42").await?;
//! # Ok::<(), sinkwatch_adapters::SinkError>(())
//! # });
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use sinkwatch_types::SinkId;

use crate::sink::{parse_date, record_id};
use crate::{Document, Sink, SinkError};

/// A sink that reads records from a JSON-lines file.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    id: SinkId,
    path: PathBuf,
    date_field: Option<String>,
}

impl JsonlSink {
    /// Create a sink for the file at `path`.
    pub fn new<P: AsRef<Path>>(id: impl Into<SinkId>, path: P, date_field: Option<&str>) -> Self {
        Self {
            id: id.into(),
            path: path.as_ref().to_path_buf(),
            date_field: date_field.map(str::to_string),
        }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_records(&self) -> Result<Vec<Document>, SinkError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(doc)) => records.push(doc),
                Ok(_) => debug!(sink = %self.id, line = index + 1, "Skipping non-object record"),
                Err(e) => debug!(
                    sink = %self.id,
                    line = index + 1,
                    error = %e,
                    "Skipping malformed record"
                ),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl Sink for JsonlSink {
    fn id(&self) -> &SinkId {
        &self.id
    }

    fn searchable_date_field(&self) -> Option<&str> {
        self.date_field.as_deref()
    }

    async fn find_most_recent(
        &self,
        after: DateTime<Utc>,
        date_field: &str,
    ) -> Result<Option<Document>, SinkError> {
        let records = self.read_records().await?;

        // Later lines win ties, matching append order.
        let mut newest: Option<(DateTime<Utc>, Document)> = None;
        for doc in records {
            let Some(date) = doc.get(date_field).and_then(parse_date) else {
                continue;
            };
            if date <= after {
                continue;
            }
            if newest.as_ref().map_or(true, |(best, _)| date >= *best) {
                newest = Some((date, doc));
            }
        }

        Ok(newest.map(|(_, doc)| doc))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, SinkError> {
        let records = self.read_records().await?;
        Ok(records
            .into_iter()
            .find(|doc| record_id(doc).as_deref() == Some(id)))
    }
}
