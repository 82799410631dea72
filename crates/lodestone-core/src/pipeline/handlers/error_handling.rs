use crate::{
    pipeline::{Handler, Next, PipelineContext, PipelineError, Staged},
    traits::EntityKind,
};
use async_trait::async_trait;
use tracing::warn;

///
/// ErrorHandlingHandler
///
/// Outermost stage: retries transient failures by re-running the
/// remainder of the chain from scratch, sleeping
/// `initial * 2^(attempt-1)` between attempts, and wraps whatever
/// error survives with the query description.
///
/// Retries are sequential; the configured budget counts re-runs, not
/// total attempts.
///

pub struct ErrorHandlingHandler;

#[async_trait]
impl<E: EntityKind> Handler<E> for ErrorHandlingHandler {
    fn name(&self) -> &'static str {
        "error_handling"
    }

    async fn handle(
        &self,
        ctx: PipelineContext,
        next: Next<E>,
    ) -> Result<Staged<E>, PipelineError> {
        let config = ctx.exec.config().clone();
        let mut attempt: u32 = 0;

        loop {
            let error = match next.run(ctx.clone()).await {
                Ok(staged) => return Ok(staged),
                Err(error) => error,
            };

            if !error.is_transient() {
                return Err(describe(error, &ctx));
            }

            if attempt >= config.max_retries {
                let exhausted = match error {
                    PipelineError::Store(source) => PipelineError::RetriesExhausted {
                        attempts: attempt + 1,
                        source,
                    },
                    other => other,
                };
                return Err(describe(exhausted, &ctx));
            }

            attempt += 1;
            let delay = config.retry_delay(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "transient store failure, retrying"
            );

            tokio::select! {
                () = ctx.cancel.cancelled() => {
                    return Err(describe(PipelineError::Cancelled, &ctx));
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn describe(error: PipelineError, ctx: &PipelineContext) -> PipelineError {
    PipelineError::Described {
        query: ctx.plan.to_string(),
        source: Box::new(error),
    }
}
