use crate::error::Error;
use futures::{stream, StreamExt, TryStreamExt};
use lodestone_core::{
    config::ProviderConfig,
    context::{ExecutionContext, Tracker},
    expr::ValueExpr,
    materialize::ProjectionRow,
    path::DocumentPath,
    pipeline::{EntityStream, PipelineContext, PipelineResult, QueryKind, QueryPipeline},
    query::{
        operator::{AggregateOp, FilterExpr, QueryOp, SelectExpr},
        plan::{AggregateKind, OrderDirection, ScalarKind},
        translate,
    },
    serialize::to_document,
    store::{DocumentStore, WriteOp},
    traits::EntityKind,
    value::Value,
};
use std::{marker::PhantomData, sync::Arc};
use tokio_util::sync::CancellationToken;

///
/// Session
///
/// One logical unit of work over a document store: queries start here,
/// tracked snapshots accumulate here, and saves consult them to skip
/// unchanged writes.
///

#[derive(Clone)]
pub struct Session {
    store: Arc<dyn DocumentStore>,
    config: ProviderConfig,
    tracker: Arc<Tracker>,
    cancel: CancellationToken,
}

impl Session {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            config: ProviderConfig::default(),
            tracker: Arc::new(Tracker::new()),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ProviderConfig) -> Self {
        self.config = config;
        self
    }

    /// Cancellation token observed by this session's write calls.
    /// Queries carry their own via `Query::with_cancel`.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    #[must_use]
    pub const fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }

    /// Start a query over an entity type.
    #[must_use]
    pub fn load<E: EntityKind>(&self) -> Query<E> {
        Query {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            tracker: Arc::clone(&self.tracker),
            ops: Vec::new(),
            params: Vec::new(),
            tracking: false,
            cancel: None,
            _entity: PhantomData,
        }
    }

    /// Fetch one entity by primary key. Resolves as a direct document
    /// lookup rather than a collection scan.
    pub async fn get<E: EntityKind>(&self, id: impl Into<String>) -> Result<Option<E>, Error> {
        self.load::<E>()
            .filter(FilterExpr::eq(E::MODEL.primary_key, id.into()))
            .one()
            .await
    }

    /// Insert or replace one entity. When a tracked snapshot matches
    /// the serialized document, the write is skipped.
    pub async fn save<E: EntityKind>(&self, entity: &E) -> Result<(), Error> {
        let doc = to_document(entity)?;
        if let Some(snapshot) = self.tracker.snapshot(&doc.path)
            && snapshot == doc
        {
            return Ok(());
        }

        self.store
            .commit(vec![WriteOp::Put(doc.clone())], &self.cancel)
            .await?;
        self.tracker.record(&doc);
        Ok(())
    }

    /// Save a batch of entities in one atomic commit.
    pub async fn save_all<E: EntityKind>(&self, entities: &[E]) -> Result<(), Error> {
        let mut writes = Vec::with_capacity(entities.len());
        let mut docs = Vec::with_capacity(entities.len());
        for entity in entities {
            let doc = to_document(entity)?;
            writes.push(WriteOp::Put(doc.clone()));
            docs.push(doc);
        }

        self.store.commit(writes, &self.cancel).await?;
        for doc in &docs {
            self.tracker.record(doc);
        }
        Ok(())
    }

    pub async fn delete<E: EntityKind>(&self, entity: &E) -> Result<(), Error> {
        let path = entity.document_path()?;
        self.store
            .commit(vec![WriteOp::Delete(path)], &self.cancel)
            .await?;
        Ok(())
    }

    /// Delete by primary key without loading the entity first.
    pub async fn delete_by_id<E: EntityKind>(&self, id: impl Into<String>) -> Result<(), Error> {
        let path = DocumentPath::new(E::MODEL.collection, id.into());
        self.store
            .commit(vec![WriteOp::Delete(path)], &self.cancel)
            .await?;
        Ok(())
    }
}

///
/// Query
///
/// Fluent operator accumulator over one entity type. Builder calls
/// append operators in call order; terminals translate the chain,
/// run the pipeline, and shape its result.
///

pub struct Query<E: EntityKind> {
    store: Arc<dyn DocumentStore>,
    config: ProviderConfig,
    tracker: Arc<Tracker>,
    ops: Vec<QueryOp>,
    params: Vec<(String, Value)>,
    tracking: bool,
    cancel: Option<CancellationToken>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntityKind> Query<E> {
    //
    // Builders
    //

    #[must_use]
    pub fn filter(mut self, expr: FilterExpr) -> Self {
        self.ops.push(QueryOp::Filter(expr));
        self
    }

    #[must_use]
    pub fn order_by(self, property: impl Into<String>) -> Self {
        self.order(property, OrderDirection::Asc)
    }

    #[must_use]
    pub fn order_by_desc(self, property: impl Into<String>) -> Self {
        self.order(property, OrderDirection::Desc)
    }

    fn order(mut self, property: impl Into<String>, direction: OrderDirection) -> Self {
        self.ops.push(QueryOp::OrderBy {
            property: property.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn then_by(mut self, property: impl Into<String>) -> Self {
        self.ops.push(QueryOp::ThenBy {
            property: property.into(),
            direction: OrderDirection::Asc,
        });
        self
    }

    #[must_use]
    pub fn then_by_desc(mut self, property: impl Into<String>) -> Self {
        self.ops.push(QueryOp::ThenBy {
            property: property.into(),
            direction: OrderDirection::Desc,
        });
        self
    }

    #[must_use]
    pub fn skip(mut self, count: i64) -> Self {
        self.ops.push(QueryOp::Skip(ValueExpr::constant(count)));
        self
    }

    #[must_use]
    pub fn take(mut self, count: i64) -> Self {
        self.ops.push(QueryOp::Take(ValueExpr::constant(count)));
        self
    }

    #[must_use]
    pub fn take_last(mut self, count: i64) -> Self {
        self.ops.push(QueryOp::TakeLast(ValueExpr::constant(count)));
        self
    }

    /// Deferred variant of `take`; the count binds from `param` at
    /// execution time.
    #[must_use]
    pub fn take_expr(mut self, expr: ValueExpr) -> Self {
        self.ops.push(QueryOp::Take(expr));
        self
    }

    /// Resume from a cursor position over the current ordering.
    #[must_use]
    pub fn start_at(mut self, values: Vec<Value>, inclusive: bool) -> Self {
        self.ops.push(QueryOp::StartAt {
            values: values.into_iter().map(ValueExpr::Constant).collect(),
            inclusive,
        });
        self
    }

    /// Eager-load a configured navigation.
    #[must_use]
    pub fn include(mut self, navigation: impl Into<String>) -> Self {
        self.ops.push(QueryOp::Include {
            navigation: navigation.into(),
        });
        self
    }

    /// Shape the result instead of materializing whole entities.
    /// Terminate with `rows`.
    #[must_use]
    pub fn select(mut self, expr: SelectExpr) -> Self {
        self.ops.push(QueryOp::Select(expr));
        self
    }

    /// Append a raw operator, for shapes without a dedicated builder.
    #[must_use]
    pub fn op(mut self, op: QueryOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Bind a named runtime parameter for deferred expressions.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Snapshot returned documents into the session tracker.
    #[must_use]
    pub fn tracked(mut self) -> Self {
        self.tracking = true;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    //
    // Terminals
    //

    pub async fn all(self) -> Result<Vec<E>, Error> {
        match self.run(QueryKind::Entity).await? {
            PipelineResult::Entities(entities) => Ok(entities),
            other => Err(Error::unexpected_shape("an entity list", other.kind_name())),
        }
    }

    /// At most one entity. More than one match is an error, not a
    /// silent first-of.
    pub async fn one(self) -> Result<Option<E>, Error> {
        let mut entities = self.take(2).all().await?;
        if entities.len() > 1 {
            return Err(Error::not_unique(E::MODEL.entity));
        }
        Ok(entities.pop())
    }

    /// Lazy entity stream. Nothing executes until the stream is first
    /// polled.
    #[must_use]
    pub fn stream(self) -> stream::BoxStream<'static, Result<E, Error>> {
        let deferred = async move {
            match self.run_streaming().await? {
                PipelineResult::Stream(entities) => Ok(into_facade_stream(entities)),
                PipelineResult::Entities(entities) => {
                    Ok(stream::iter(entities.into_iter().map(Ok)).boxed())
                }
                other => Err(Error::unexpected_shape(
                    "an entity stream",
                    other.kind_name(),
                )),
            }
        };
        stream::once(deferred).try_flatten().boxed()
    }

    pub async fn count(self) -> Result<i64, Error> {
        match self
            .scalar(AggregateKind::Count, None, ScalarKind::Int)
            .await?
        {
            Value::Int(n) => Ok(n),
            other => Err(Error::unexpected_shape("an int scalar", kind_of(&other))),
        }
    }

    pub async fn any(self) -> Result<bool, Error> {
        match self
            .scalar(AggregateKind::Any, None, ScalarKind::Bool)
            .await?
        {
            Value::Bool(b) => Ok(b),
            other => Err(Error::unexpected_shape("a bool scalar", kind_of(&other))),
        }
    }

    pub async fn sum(self, property: impl Into<String>) -> Result<Value, Error> {
        self.scalar(AggregateKind::Sum, Some(property.into()), ScalarKind::Double)
            .await
    }

    pub async fn average(self, property: impl Into<String>) -> Result<Value, Error> {
        self.scalar(
            AggregateKind::Average,
            Some(property.into()),
            ScalarKind::Double,
        )
        .await
    }

    pub async fn min(self, property: impl Into<String>) -> Result<Value, Error> {
        self.scalar(AggregateKind::Min, Some(property.into()), ScalarKind::Double)
            .await
    }

    pub async fn max(self, property: impl Into<String>) -> Result<Value, Error> {
        self.scalar(AggregateKind::Max, Some(property.into()), ScalarKind::Double)
            .await
    }

    /// Shaped rows for a query built with `select`.
    pub async fn rows(self) -> Result<Vec<ProjectionRow>, Error> {
        match self.run(QueryKind::Projection).await? {
            PipelineResult::Rows(rows) => Ok(rows),
            other => Err(Error::unexpected_shape("projection rows", other.kind_name())),
        }
    }

    //
    // Execution
    //

    async fn scalar(
        mut self,
        kind: AggregateKind,
        property: Option<String>,
        result: ScalarKind,
    ) -> Result<Value, Error> {
        self.ops.push(QueryOp::Aggregate(AggregateOp {
            kind,
            property,
            result,
        }));
        match self.run(QueryKind::Aggregation).await? {
            PipelineResult::Scalar(value) => Ok(value),
            other => Err(Error::unexpected_shape("a scalar", other.kind_name())),
        }
    }

    async fn run(self, kind: QueryKind) -> Result<PipelineResult<E>, Error> {
        let pipeline: QueryPipeline<E> = QueryPipeline::standard(Arc::clone(&self.store));
        let ctx = self.context(kind)?;
        pipeline.run(ctx).await.map_err(Into::into)
    }

    async fn run_streaming(self) -> Result<PipelineResult<E>, Error> {
        let pipeline: QueryPipeline<E> = QueryPipeline::standard(Arc::clone(&self.store));
        let ctx = self.context(QueryKind::Entity)?.with_streaming(true);
        pipeline.run(ctx).await.map_err(Into::into)
    }

    fn context(&self, kind: QueryKind) -> Result<PipelineContext, Error> {
        let plan = translate::translate(E::MODEL, self.ops.clone())?;

        let mut exec = ExecutionContext::new().with_config(self.config.clone());
        for (name, value) in &self.params {
            exec = exec.with_param(name.clone(), value.clone());
        }
        if self.tracking {
            exec = exec.with_tracker(Arc::clone(&self.tracker));
        }

        let mut ctx = PipelineContext::new(Arc::new(plan), Arc::new(exec), kind)
            .with_tracking(self.tracking);
        if let Some(cancel) = &self.cancel {
            ctx = ctx.with_cancel(cancel.clone());
        }

        Ok(ctx)
    }
}

fn into_facade_stream<E: EntityKind>(
    entities: EntityStream<E>,
) -> stream::BoxStream<'static, Result<E, Error>> {
    entities.map_err(Error::from).boxed()
}

/// Value kind label for shape diagnostics.
const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Double(_) => "double",
        Value::Text(_) => "text",
        Value::Enum(_) => "enum",
        Value::Bytes(_) => "bytes",
        Value::Timestamp(_) => "timestamp",
        Value::GeoPoint(_) => "geo point",
        Value::Reference(_) => "reference",
        Value::List(_) => "list",
        Value::Map(_) => "map",
    }
}
