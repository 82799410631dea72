use crate::{
    pipeline::{Handler, Next, PipelineContext, PipelineError, Staged},
    query::resolve,
    traits::EntityKind,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

///
/// ResolveHandler
///
/// Binds the frozen plan against the execution context and attaches
/// the resolved query to the context for the stages below. Binding
/// failures are permanent and surface immediately.
///

pub struct ResolveHandler;

#[async_trait]
impl<E: EntityKind> Handler<E> for ResolveHandler {
    fn name(&self) -> &'static str {
        "resolve"
    }

    async fn handle(
        &self,
        ctx: PipelineContext,
        next: Next<E>,
    ) -> Result<Staged<E>, PipelineError> {
        if ctx.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        if ctx.exec.config().enable_ast_logging {
            debug!(plan = %ctx.plan, "translated plan");
        }

        let resolved = Arc::new(resolve::resolve(&ctx.plan, &ctx.exec)?);
        next.run(ctx.with_resolved(resolved)).await
    }
}
