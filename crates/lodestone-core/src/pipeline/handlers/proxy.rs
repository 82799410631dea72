use crate::{
    pipeline::{meta, Handler, MetaValue, Next, PipelineContext, PipelineError, Staged},
    traits::EntityKind,
};
use async_trait::async_trait;

///
/// ProxyHandler
///
/// Switches reference navigations into lazy handles when the provider
/// is configured for them: the execution stage then skips fetching
/// referenced documents and the deserializer leaves `DocRef` handles
/// unresolved. Pass-through otherwise.
///

pub struct ProxyHandler;

#[async_trait]
impl<E: EntityKind> Handler<E> for ProxyHandler {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn handle(
        &self,
        ctx: PipelineContext,
        next: Next<E>,
    ) -> Result<Staged<E>, PipelineError> {
        if !ctx.exec.config().lazy_references {
            return next.run(ctx).await;
        }

        let metadata = ctx
            .metadata
            .with(meta::LAZY_REFERENCES, MetaValue::Flag(true));
        next.run(ctx.with_metadata(metadata)).await
    }
}
