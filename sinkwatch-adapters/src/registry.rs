//! Lookup of sinks by id.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use sinkwatch_types::SinkId;

use crate::Sink;

/// The set of sinks monitors can refer to, keyed by [`SinkId`].
#[derive(Clone, Default)]
pub struct SinkRegistry {
    sinks: BTreeMap<SinkId, Arc<dyn Sink>>,
}

impl SinkRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink under its own id, replacing any previous one.
    pub fn register(&mut self, sink: Arc<dyn Sink>) {
        self.sinks.insert(sink.id().clone(), sink);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, sink: Arc<dyn Sink>) -> Self {
        self.register(sink);
        self
    }

    /// Get a sink by id.
    pub fn get(&self, id: &SinkId) -> Option<Arc<dyn Sink>> {
        self.sinks.get(id).cloned()
    }

    /// Whether a sink with this id is registered.
    pub fn contains(&self, id: &SinkId) -> bool {
        self.sinks.contains_key(id)
    }

    /// Ids of all registered sinks, in order.
    pub fn ids(&self) -> impl Iterator<Item = &SinkId> {
        self.sinks.keys()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("sinks", &self.sinks.keys().collect::<Vec<_>>())
            .finish()
    }
}
