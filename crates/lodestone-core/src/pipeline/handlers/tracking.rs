use crate::{
    pipeline::{meta, Handler, Next, PipelineContext, PipelineError, Staged},
    traits::EntityKind,
};
use async_trait::async_trait;

///
/// TrackingHandler
///
/// After execution, snapshots every loaded document into the execution
/// context's tracker so later saves can diff against what the store
/// returned. No-op for untracked queries or contexts without a
/// tracker.
///

pub struct TrackingHandler;

#[async_trait]
impl<E: EntityKind> Handler<E> for TrackingHandler {
    fn name(&self) -> &'static str {
        "tracking"
    }

    async fn handle(
        &self,
        ctx: PipelineContext,
        next: Next<E>,
    ) -> Result<Staged<E>, PipelineError> {
        let staged = next.run(ctx.clone()).await?;

        if ctx.tracking
            && let Some(tracker) = ctx.exec.tracker()
            && let Some(pool) = staged.ctx.metadata.documents(meta::DOCUMENT_POOL)
        {
            for doc in pool.iter() {
                tracker.record(doc);
            }
        }

        Ok(staged)
    }
}
