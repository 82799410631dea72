use crate::{
    document::{Document, DocumentPool},
    model::NavigationKind,
    pipeline::{
        meta, Handler, MetaValue, Next, PipelineContext, PipelineError, PipelineResult, Staged,
    },
    query::{
        plan::aggregation_key,
        resolve::{ResolvedQuery, ResolvedSubResource},
    },
    store::{AggregateRequest, DocumentStore, StoreError},
    traits::EntityKind,
    value::Value,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::{collections::BTreeMap, sync::Arc};
use tokio_util::sync::CancellationToken;

///
/// ExecuteHandler
///
/// Terminal stage: talks to the store. Point lookups become direct
/// fetches, aggregations run server-side and come back as scalars,
/// everything else runs as a collection query. Include targets and
/// sub-resource documents are loaded into the invocation's document
/// pool, sub-resource aggregates into the aggregation map; both are
/// stashed in context metadata for the stages above.
///

pub struct ExecuteHandler {
    store: Arc<dyn DocumentStore>,
}

impl ExecuteHandler {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Load referenced and child documents for the plan's includes.
    async fn load_includes(
        &self,
        ctx: &PipelineContext,
        resolved: &ResolvedQuery,
        roots: &[Document],
        pool: &mut DocumentPool,
        lazy: bool,
    ) -> Result<(), PipelineError> {
        for include in &resolved.includes {
            ensure_live(ctx)?;

            if include.is_collection {
                for root in roots {
                    let children = self
                        .store
                        .fetch_children(
                            &root.path,
                            include.target_collection,
                            &[],
                            &[],
                            None,
                            &ctx.cancel,
                        )
                        .await?;
                    for child in children {
                        pool.insert(child);
                    }
                }
                continue;
            }

            // Lazy references stay as unresolved handles; nothing to load.
            if lazy {
                continue;
            }

            let Some(nav) = ctx.plan.model().navigation(&include.navigation) else {
                continue;
            };
            let NavigationKind::Reference { field, .. } = nav.kind else {
                continue;
            };

            for root in roots {
                if let Some(Value::Reference(path)) = root.get(field)
                    && pool.get(path).is_none()
                    && let Some(doc) = self.store.fetch(path, &ctx.cancel).await?
                {
                    pool.insert(doc);
                }
            }
        }

        Ok(())
    }

    /// Load sub-resource children and aggregates, depth-first.
    fn load_sub_resources<'a>(
        &'a self,
        parents: &'a [Document],
        subs: &'a [ResolvedSubResource],
        pool: &'a mut DocumentPool,
        aggregations: &'a mut BTreeMap<String, Value>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            for sub in subs {
                for parent in parents {
                    if let Some(agg) = &sub.aggregation {
                        let value = self
                            .store
                            .aggregate_children(
                                &parent.path,
                                sub.target_collection,
                                &sub.filters,
                                &AggregateRequest {
                                    kind: agg.kind,
                                    field: agg.field.clone(),
                                },
                                cancel,
                            )
                            .await?;
                        aggregations.insert(
                            aggregation_key(&parent.path.to_string(), &sub.result_name),
                            value,
                        );
                        continue;
                    }

                    let children = self
                        .store
                        .fetch_children(
                            &parent.path,
                            sub.target_collection,
                            &sub.filters,
                            &sub.order,
                            sub.limit,
                            cancel,
                        )
                        .await?;

                    self.load_sub_resources(&children, &sub.nested, pool, aggregations, cancel)
                        .await?;
                    for child in children {
                        pool.insert(child);
                    }
                }
            }
            Ok(())
        }
        .boxed()
    }
}

#[async_trait]
impl<E: EntityKind> Handler<E> for ExecuteHandler {
    fn name(&self) -> &'static str {
        "execute"
    }

    async fn handle(
        &self,
        ctx: PipelineContext,
        _next: Next<E>,
    ) -> Result<Staged<E>, PipelineError> {
        ensure_live(&ctx)?;

        let resolved = ctx
            .resolved
            .clone()
            .ok_or(PipelineError::MissingStage("resolve"))?;

        // Scalar path: the whole query runs as one native aggregate.
        if let Some(agg) = &resolved.aggregation {
            let value = self
                .store
                .run_aggregate(
                    &resolved,
                    &AggregateRequest {
                        kind: agg.kind,
                        field: agg.field.clone(),
                    },
                    &ctx.cancel,
                )
                .await?;
            return Ok(Staged {
                ctx,
                result: PipelineResult::Scalar(value),
            });
        }

        let roots: Vec<Document> = if let Some(path) = &resolved.lookup {
            self.store.fetch(path, &ctx.cancel).await?.into_iter().collect()
        } else {
            self.store.run_query(&resolved, &ctx.cancel).await?
        };

        let mut pool = DocumentPool::new();
        for doc in &roots {
            pool.insert(doc.clone());
        }

        let lazy = ctx.metadata.flag(meta::LAZY_REFERENCES);
        let mut aggregations = BTreeMap::new();

        // Projections load exactly the sub-resources they shape;
        // entity queries load their includes.
        if let Some(projection) = &resolved.projection {
            ensure_live(&ctx)?;
            self.load_sub_resources(
                &roots,
                &projection.sub_resources,
                &mut pool,
                &mut aggregations,
                &ctx.cancel,
            )
            .await?;
        } else {
            self.load_includes(&ctx, &resolved, &roots, &mut pool, lazy)
                .await?;
        }

        let metadata = ctx
            .metadata
            .with(meta::DOCUMENT_POOL, MetaValue::Documents(Arc::new(pool)))
            .with(
                meta::AGGREGATIONS,
                MetaValue::Aggregations(Arc::new(aggregations)),
            );

        Ok(Staged {
            ctx: ctx.with_metadata(metadata),
            result: PipelineResult::Documents(roots),
        })
    }
}

fn ensure_live(ctx: &PipelineContext) -> Result<(), PipelineError> {
    if ctx.cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}
