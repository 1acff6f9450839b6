//! In-memory sink.
//!
//! Holds records in a vector behind a lock. Useful for embedding sinkwatch in
//! a process that already sees every write, and for tests.
//!
//! ## Example
//!
//! ```rust
//! use sinkwatch_adapters::{MemorySink, Sink};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let sink = MemorySink::new("dns", Some("timestamp"));
//! sink.push(json!({"_id": "a", "timestamp": "2024-03-01T12:00:00Z"}));
//!
//! let after = chrono::DateTime::UNIX_EPOCH;
//! let doc = sink.find_most_recent(after, "timestamp").await.unwrap();
//! assert!(doc.is_some());
//! # });
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

use sinkwatch_types::SinkId;

use crate::sink::{parse_date, record_id};
use crate::{Document, Sink, SinkError};

/// A sink backed by an in-memory list of records.
#[derive(Debug)]
pub struct MemorySink {
    id: SinkId,
    date_field: Option<String>,
    records: RwLock<Vec<Document>>,
    failure: RwLock<Option<SinkError>>,
    queries: AtomicU64,
}

impl MemorySink {
    /// Create an empty sink. `date_field` names the searchable date field,
    /// if the sink has one.
    pub fn new(id: impl Into<SinkId>, date_field: Option<&str>) -> Self {
        Self {
            id: id.into(),
            date_field: date_field.map(str::to_string),
            records: RwLock::new(Vec::new()),
            failure: RwLock::new(None),
            queries: AtomicU64::new(0),
        }
    }

    /// Append a record. Non-object values are ignored.
    pub fn push(&self, record: Value) {
        if let Value::Object(doc) = record {
            self.records.write().push(doc);
        }
    }

    /// Make every subsequent query fail with `error`, or clear the failure.
    pub fn fail_with(&self, error: Option<SinkError>) {
        *self.failure.write() = error;
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Number of queries served so far, including failed ones.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    fn begin_query(&self) -> Result<(), SinkError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        match self.failure.read().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Sink for MemorySink {
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
        self.begin_query()?;

        let records = self.records.read();
        let newest = records
            .iter()
            .filter_map(|doc| {
                let date = doc.get(date_field).and_then(parse_date)?;
                (date > after).then_some((date, doc))
            })
            .max_by_key(|(date, _)| *date)
            .map(|(_, doc)| doc.clone());

        Ok(newest)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, SinkError> {
        self.begin_query()?;

        let records = self.records.read();
        Ok(records
            .iter()
            .find(|doc| record_id(doc).as_deref() == Some(id))
            .cloned())
    }
}
