use crate::{
    materialize::{deserialize, materialize_rows},
    pipeline::{
        meta, Handler, Next, PipelineContext, PipelineError, PipelineResult, QueryKind, Staged,
    },
    traits::EntityKind,
};
use async_trait::async_trait;
use futures::stream;

///
/// ConvertHandler
///
/// Reshapes the execution stage's raw documents into what the caller
/// asked for: typed entities (materialized or streamed) for entity
/// queries, shaped rows for projections. Scalars and anything already
/// shaped pass through.
///

pub struct ConvertHandler;

#[async_trait]
impl<E: EntityKind> Handler<E> for ConvertHandler {
    fn name(&self) -> &'static str {
        "convert"
    }

    async fn handle(
        &self,
        ctx: PipelineContext,
        next: Next<E>,
    ) -> Result<Staged<E>, PipelineError> {
        let Staged { ctx: inner, result } = next.run(ctx.clone()).await?;

        let result = match (ctx.kind, result) {
            (QueryKind::Entity, PipelineResult::Documents(roots)) => {
                let pool = inner
                    .metadata
                    .documents(meta::DOCUMENT_POOL)
                    .ok_or(PipelineError::MissingStage("execute"))?;
                let lazy = inner.metadata.flag(meta::LAZY_REFERENCES);

                let mut entities = Vec::with_capacity(roots.len());
                for doc in &roots {
                    entities.push(deserialize::<E>(doc, &pool, lazy)?);
                }

                if ctx.streaming {
                    PipelineResult::Stream(Box::pin(stream::iter(entities.into_iter().map(Ok))))
                } else {
                    PipelineResult::Entities(entities)
                }
            }

            (QueryKind::Projection, PipelineResult::Documents(roots)) => {
                let pool = inner
                    .metadata
                    .documents(meta::DOCUMENT_POOL)
                    .ok_or(PipelineError::MissingStage("execute"))?;
                let aggregations = inner
                    .metadata
                    .aggregations(meta::AGGREGATIONS)
                    .unwrap_or_default();
                let resolved = inner
                    .resolved
                    .as_ref()
                    .ok_or(PipelineError::MissingStage("resolve"))?;
                let projection = resolved
                    .projection
                    .as_ref()
                    .ok_or(PipelineError::MissingStage("resolve"))?;

                PipelineResult::Rows(materialize_rows(projection, &roots, &pool, &aggregations))
            }

            (_, passthrough) => passthrough,
        };

        Ok(Staged { ctx: inner, result })
    }
}
