use crate::{
    document::Document,
    path::DocumentPath,
    query::{
        plan::{AggregateKind, OrderClause},
        resolve::{compare_documents, ResolvedFilter, ResolvedQuery},
    },
    store::{AggregateRequest, DocumentStore, StoreError, StoreStatus, WriteOp},
    value::Value,
};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, VecDeque},
    sync::Mutex,
};
use tokio_util::sync::CancellationToken;

///
/// MemoryStore
///
/// Reference implementation of the store boundary over a path-keyed
/// map. It honors exactly the native model the resolver emits:
/// equality/range/membership filters AND-combined (OR groups as a
/// disjunction over one group each), clause-list ordering with the
/// path tiebreaker, offset/limit/limit-to-last, start cursors, and
/// the five native aggregates.
///
/// Failures can be queued ahead of calls to exercise the retry
/// handler; each queued failure is consumed by the next store call.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, Document>>,
    failures: Mutex<VecDeque<StoreError>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, doc: Document) {
        let mut docs = self.docs.lock().expect("memory store poisoned");
        docs.insert(doc.path.to_string(), doc);
    }

    /// Queue a failure to be returned by the next store call.
    pub fn inject_failure(&self, error: StoreError) {
        let mut failures = self.failures.lock().expect("memory store poisoned");
        failures.push_back(error);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.lock().expect("memory store poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_failure(&self) -> Option<StoreError> {
        let mut failures = self.failures.lock().expect("memory store poisoned");
        failures.pop_front()
    }

    fn guard(&self, cancel: &CancellationToken) -> Result<(), StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::new(StoreStatus::Cancelled, "call cancelled"));
        }
        match self.take_failure() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Filtered, ordered candidates for a resolved query, before
    /// pagination.
    ///
    /// A collection query spans every document in the named collection
    /// regardless of nesting depth, so sub-resource entities are
    /// queryable as a group. Parent-scoped child loads go through
    /// `fetch_children` instead.
    fn candidates(&self, query: &ResolvedQuery) -> Vec<Document> {
        let docs = self.docs.lock().expect("memory store poisoned");

        let mut matched: Vec<Document> = docs
            .values()
            .filter(|doc| doc.path.collection() == query.collection)
            .filter(|doc| query.filters.iter().all(|f| f.matches(doc)))
            .filter(|doc| {
                query
                    .or_groups
                    .iter()
                    .all(|group| group.iter().any(|f| f.matches(doc)))
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| compare_documents(a, b, &query.order));

        if let Some(cursor) = &query.start_cursor {
            matched.retain(|doc| {
                let ord = boundary_ordering(doc, &query.order, &cursor.values);
                if cursor.inclusive {
                    ord != std::cmp::Ordering::Less
                } else {
                    ord == std::cmp::Ordering::Greater
                }
            });
        }

        matched
    }

    fn paginate(query: &ResolvedQuery, mut matched: Vec<Document>) -> Vec<Document> {
        if let Some(offset) = query.offset {
            matched.drain(..offset.min(matched.len()));
        }
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        if let Some(n) = query.limit_to_last {
            // Last n of the ordered set, order preserved.
            let cut = matched.len().saturating_sub(n);
            matched.drain(..cut);
        }
        matched
    }
}

/// Position of a document relative to a cursor boundary under the
/// query's ordering.
fn boundary_ordering(
    doc: &Document,
    order: &[OrderClause],
    boundary: &[Value],
) -> std::cmp::Ordering {
    use crate::query::plan::OrderDirection;

    for (clause, bound) in order.iter().zip(boundary) {
        let ord = doc.get_or_null(&clause.field).compare(bound);
        let ord = match clause.direction {
            OrderDirection::Asc => ord,
            OrderDirection::Desc => ord.reverse(),
        };
        if ord != std::cmp::Ordering::Equal {
            return ord;
        }
    }

    std::cmp::Ordering::Equal
}

/// Compute one native aggregate over a document set.
fn aggregate(docs: &[Document], request: &AggregateRequest) -> Result<Value, StoreError> {
    let field = request.field.as_deref();

    let values: Vec<Value> = match field {
        Some(field) => docs
            .iter()
            .map(|doc| doc.get_or_null(field))
            .filter(|v| !v.is_null())
            .collect(),
        None => Vec::new(),
    };

    let result = match request.kind {
        AggregateKind::Count => Value::Int(i64::try_from(docs.len()).unwrap_or(i64::MAX)),
        AggregateKind::Any => Value::Bool(!docs.is_empty()),

        AggregateKind::Sum => numeric_sum(&values)?,

        AggregateKind::Average => {
            if values.is_empty() {
                Value::Null
            } else {
                let Value::Double(total) = widen(numeric_sum(&values)?) else {
                    unreachable!()
                };
                #[allow(clippy::cast_precision_loss)]
                Value::Double(total / values.len() as f64)
            }
        }

        AggregateKind::Min => values
            .iter()
            .min_by(|a, b| a.compare(b))
            .cloned()
            .unwrap_or(Value::Null),

        AggregateKind::Max => values
            .iter()
            .max_by(|a, b| a.compare(b))
            .cloned()
            .unwrap_or(Value::Null),
    };

    Ok(result)
}

/// Integer-preserving sum; mixed or double inputs widen.
fn numeric_sum(values: &[Value]) -> Result<Value, StoreError> {
    let mut int_total: i64 = 0;
    let mut double_total = 0.0;
    let mut all_int = true;

    for value in values {
        match value {
            Value::Int(n) => {
                int_total = int_total.checked_add(*n).ok_or_else(|| {
                    StoreError::new(StoreStatus::InvalidArgument, "sum overflows")
                })?;
                #[allow(clippy::cast_precision_loss)]
                {
                    double_total += *n as f64;
                }
            }
            Value::Double(d) => {
                all_int = false;
                double_total += d;
            }
            other => {
                return Err(StoreError::new(
                    StoreStatus::InvalidArgument,
                    format!("cannot sum over non-numeric value {other}"),
                ));
            }
        }
    }

    Ok(if all_int {
        Value::Int(int_total)
    } else {
        Value::Double(double_total)
    })
}

fn widen(value: Value) -> Value {
    match value {
        #[allow(clippy::cast_precision_loss)]
        Value::Int(n) => Value::Double(n as f64),
        other => other,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(
        &self,
        path: &DocumentPath,
        cancel: &CancellationToken,
    ) -> Result<Option<Document>, StoreError> {
        self.guard(cancel)?;
        let docs = self.docs.lock().expect("memory store poisoned");
        Ok(docs.get(&path.to_string()).cloned())
    }

    async fn run_query(
        &self,
        query: &ResolvedQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<Document>, StoreError> {
        self.guard(cancel)?;
        Ok(Self::paginate(query, self.candidates(query)))
    }

    async fn run_aggregate(
        &self,
        query: &ResolvedQuery,
        request: &AggregateRequest,
        cancel: &CancellationToken,
    ) -> Result<Value, StoreError> {
        self.guard(cancel)?;
        let docs = Self::paginate(query, self.candidates(query));
        aggregate(&docs, request)
    }

    async fn fetch_children(
        &self,
        parent: &DocumentPath,
        collection: &str,
        filters: &[ResolvedFilter],
        order: &[OrderClause],
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Document>, StoreError> {
        self.guard(cancel)?;

        let docs = self.docs.lock().expect("memory store poisoned");
        let mut children: Vec<Document> = docs
            .values()
            .filter(|doc| doc.path.is_child_of(parent, collection))
            .filter(|doc| filters.iter().all(|f| f.matches(doc)))
            .cloned()
            .collect();

        children.sort_by(|a, b| compare_documents(a, b, order));
        if let Some(limit) = limit {
            children.truncate(limit);
        }

        Ok(children)
    }

    async fn aggregate_children(
        &self,
        parent: &DocumentPath,
        collection: &str,
        filters: &[ResolvedFilter],
        request: &AggregateRequest,
        cancel: &CancellationToken,
    ) -> Result<Value, StoreError> {
        let children = self
            .fetch_children(parent, collection, filters, &[], None, cancel)
            .await?;
        aggregate(&children, request)
    }

    async fn commit(
        &self,
        writes: Vec<WriteOp>,
        cancel: &CancellationToken,
    ) -> Result<(), StoreError> {
        self.guard(cancel)?;

        let mut docs = self.docs.lock().expect("memory store poisoned");
        for write in writes {
            match write {
                WriteOp::Put(doc) => {
                    docs.insert(doc.path.to_string(), doc);
                }
                WriteOp::Delete(path) => {
                    docs.remove(&path.to_string());
                }
            }
        }

        Ok(())
    }
}
