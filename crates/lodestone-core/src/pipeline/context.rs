use crate::{
    context::ExecutionContext,
    document::DocumentPool,
    query::{plan::QueryPlan, resolve::ResolvedQuery},
    value::Value,
};
use std::{collections::BTreeMap, sync::Arc};
use tokio_util::sync::CancellationToken;

///
/// QueryKind
///
/// What the caller asked the pipeline to produce.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryKind {
    /// Typed entities.
    Entity,
    /// One scalar aggregate.
    Aggregation,
    /// Shaped projection rows.
    Projection,
    /// Existence check (scalar bool).
    Predicate,
}

///
/// Metadata
///
/// Copy-on-write key/value blackboard shared along one pipeline
/// invocation. Handlers never mutate a metadata map in place; `with`
/// produces a new map, so a nested invocation spawned mid-chain can
/// never observe writes from its parent's later stages.
///

#[derive(Clone, Debug, Default)]
pub struct Metadata(Arc<BTreeMap<&'static str, MetaValue>>);

#[derive(Clone, Debug)]
pub enum MetaValue {
    /// Every document loaded by the execution stage.
    Documents(Arc<DocumentPool>),

    /// Sub-resource aggregation results keyed by `parent:result_name`.
    Aggregations(Arc<BTreeMap<String, Value>>),

    Flag(bool),
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn with(&self, key: &'static str, value: MetaValue) -> Self {
        let mut map = (*self.0).clone();
        map.insert(key, value);
        Self(Arc::new(map))
    }

    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(MetaValue::Flag(true)))
    }

    #[must_use]
    pub fn documents(&self, key: &str) -> Option<Arc<DocumentPool>> {
        match self.get(key) {
            Some(MetaValue::Documents(pool)) => Some(Arc::clone(pool)),
            _ => None,
        }
    }

    #[must_use]
    pub fn aggregations(&self, key: &str) -> Option<Arc<BTreeMap<String, Value>>> {
        match self.get(key) {
            Some(MetaValue::Aggregations(map)) => Some(Arc::clone(map)),
            _ => None,
        }
    }
}

/// Well-known metadata keys.
pub mod meta {
    /// `MetaValue::Documents`: the invocation's document pool.
    pub const DOCUMENT_POOL: &str = "document_pool";

    /// `MetaValue::Aggregations`: sub-resource aggregation results.
    pub const AGGREGATIONS: &str = "aggregations";

    /// `MetaValue::Flag`: leave reference navigations unresolved.
    pub const LAZY_REFERENCES: &str = "lazy_references";
}

///
/// PipelineContext
///
/// Immutable value describing one pipeline invocation. Handlers that
/// need to change it build a new context with the `with_*` methods and
/// hand that down; the original stays untouched for retries.
///

#[derive(Clone, Debug)]
pub struct PipelineContext {
    pub plan: Arc<QueryPlan>,
    pub exec: Arc<ExecutionContext>,
    pub kind: QueryKind,

    /// Record document snapshots for change tracking.
    pub tracking: bool,

    /// Deliver entities as a stream instead of a materialized list.
    pub streaming: bool,

    /// Set by the resolve stage.
    pub resolved: Option<Arc<ResolvedQuery>>,

    pub metadata: Metadata,
    pub cancel: CancellationToken,
}

impl PipelineContext {
    #[must_use]
    pub fn new(plan: Arc<QueryPlan>, exec: Arc<ExecutionContext>, kind: QueryKind) -> Self {
        Self {
            plan,
            exec,
            kind,
            tracking: false,
            streaming: false,
            resolved: None,
            metadata: Metadata::new(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_tracking(mut self, tracking: bool) -> Self {
        self.tracking = tracking;
        self
    }

    #[must_use]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_resolved(mut self, resolved: Arc<ResolvedQuery>) -> Self {
        self.resolved = Some(resolved);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_updates_never_alias_the_original() {
        let base = Metadata::new();
        let updated = base.with(meta::LAZY_REFERENCES, MetaValue::Flag(true));

        assert!(!base.flag(meta::LAZY_REFERENCES));
        assert!(updated.flag(meta::LAZY_REFERENCES));

        // Divergent branches from the same parent stay isolated.
        let left = updated.with("left", MetaValue::Flag(true));
        let right = updated.with("right", MetaValue::Flag(true));
        assert!(left.get("right").is_none());
        assert!(right.get("left").is_none());
    }
}
