use crate::{
    pipeline::{Handler, Next, PipelineContext, PipelineError, Staged},
    traits::EntityKind,
};
use async_trait::async_trait;
use tracing::debug;

///
/// LogHandler
///
/// Emits the resolved query when query logging is enabled. Logging is
/// observational only; the context passes through unchanged.
///

pub struct LogHandler;

#[async_trait]
impl<E: EntityKind> Handler<E> for LogHandler {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn handle(
        &self,
        ctx: PipelineContext,
        next: Next<E>,
    ) -> Result<Staged<E>, PipelineError> {
        if ctx.exec.config().enable_query_logging {
            if let Some(resolved) = &ctx.resolved {
                debug!(
                    query = %resolved.describe(),
                    kind = ?ctx.kind,
                    caller = ctx.exec.caller().unwrap_or("-"),
                    "executing query"
                );
            }
        }

        next.run(ctx).await
    }
}
