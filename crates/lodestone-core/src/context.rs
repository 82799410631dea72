use crate::{config::ProviderConfig, document::Document, path::DocumentPath, value::Value};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

///
/// ExecutionContext
///
/// Runtime surroundings of one query execution: parameter values for
/// deferred expressions, caller metadata for diagnostics, the provider
/// configuration snapshot, and an optional change tracker.
///
/// The context is built once per execution and shared read-only by
/// every pipeline handler.
///

#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    params: BTreeMap<String, Value>,
    caller: Option<String>,
    config: ProviderConfig,
    tracker: Option<Arc<Tracker>>,
}

impl ExecutionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: ProviderConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    #[must_use]
    pub fn with_tracker(mut self, tracker: Arc<Tracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    #[must_use]
    pub fn caller(&self) -> Option<&str> {
        self.caller.as_deref()
    }

    #[must_use]
    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    #[must_use]
    pub const fn tracker(&self) -> Option<&Arc<Tracker>> {
        self.tracker.as_ref()
    }
}

///
/// Tracker
///
/// Session-scoped store of original document snapshots for entities
/// returned by tracking queries. Saves consult it to distinguish
/// updates from inserts and to skip unchanged writes.
///
/// Interior mutability is confined here; pipeline contexts themselves
/// stay immutable values.
///

#[derive(Debug, Default)]
pub struct Tracker {
    snapshots: Mutex<BTreeMap<String, Document>>,
}

impl Tracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, doc: &Document) {
        let mut snapshots = self.snapshots.lock().expect("tracker poisoned");
        snapshots.insert(doc.path.to_string(), doc.clone());
    }

    #[must_use]
    pub fn snapshot(&self, path: &DocumentPath) -> Option<Document> {
        let snapshots = self.snapshots.lock().expect("tracker poisoned");
        snapshots.get(&path.to_string()).cloned()
    }

    #[must_use]
    pub fn is_tracked(&self, path: &DocumentPath) -> bool {
        let snapshots = self.snapshots.lock().expect("tracker poisoned");
        snapshots.contains_key(&path.to_string())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.lock().expect("tracker poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
