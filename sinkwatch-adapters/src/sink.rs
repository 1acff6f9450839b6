//! The sink capability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use sinkwatch_types::SinkId;

use crate::SinkError;

/// A stored record, as a JSON object.
pub type Document = serde_json::Map<String, Value>;

/// Field holding a document's record id.
pub const ID_FIELD: &str = "_id";

/// A watched data destination.
///
/// Monitors only need one thing from a sink: the newest record written after
/// some point in time. Everything else about how a sink stores or indexes
/// data stays behind this trait.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Name under which monitors refer to this sink.
    fn id(&self) -> &SinkId;

    /// Name of the date field records can be searched by.
    ///
    /// Sinks without one are never queried.
    fn searchable_date_field(&self) -> Option<&str>;

    /// The record with the latest `date_field` strictly after `after`,
    /// or `None` if there is none.
    async fn find_most_recent(
        &self,
        after: DateTime<Utc>,
        date_field: &str,
    ) -> Result<Option<Document>, SinkError>;

    /// Look up a record by its id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, SinkError>;

    /// The searchable date of a record.
    fn date_of(&self, doc: &Document) -> Option<DateTime<Utc>> {
        let field = self.searchable_date_field()?;
        doc.get(field).and_then(parse_date)
    }
}

/// Read a record's id from its `_id` field.
///
/// String ids are returned as-is, numeric ids are rendered as decimal.
pub fn record_id(doc: &Document) -> Option<String> {
    match doc.get(ID_FIELD)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Interpret a JSON value as a UTC timestamp.
///
/// Accepts RFC 3339 strings and integer Unix timestamps in seconds.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}
