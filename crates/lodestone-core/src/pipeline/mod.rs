//! The execution pipeline.
//!
//! A mediator runs an ordered handler chain; each handler receives the
//! invocation context and a re-runnable continuation for the rest of
//! the chain. The canonical chain is
//!
//! error-handling -> resolve -> log -> proxy -> tracking -> convert -> execute
//!
//! Contexts flow down, `Staged` values flow back up carrying both the
//! result and the context as the deeper stages left it, so stages
//! above the execution stage can read what it stashed in metadata.

pub mod context;
pub mod handlers;
pub mod result;


pub use context::{meta, MetaValue, Metadata, PipelineContext, QueryKind};
pub use result::{EntityStream, PipelineResult};

use crate::{
    materialize::DeserializeError,
    query::resolve::ResolveError,
    store::{DocumentStore, StoreError},
    traits::EntityKind,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// PipelineError
///

#[derive(Debug, ThisError)]
pub enum PipelineError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Deserialize(#[from] DeserializeError),

    #[error("execution was cancelled")]
    Cancelled,

    #[error("store calls kept failing after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("pipeline invoked without a '{0}' stage result")]
    MissingStage(&'static str),

    #[error("query [{query}] failed: {source}")]
    Described {
        query: String,
        #[source]
        source: Box<Self>,
    },
}

impl PipelineError {
    /// Transient errors may succeed when the chain is re-run.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_transient())
    }
}

///
/// Staged
///
/// A stage's output: the result plus the context as the stages below
/// it left it.
///

#[derive(Debug)]
pub struct Staged<E: EntityKind> {
    pub ctx: PipelineContext,
    pub result: PipelineResult<E>,
}

///
/// Handler
///

#[async_trait]
pub trait Handler<E: EntityKind>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        ctx: PipelineContext,
        next: Next<E>,
    ) -> Result<Staged<E>, PipelineError>;
}

///
/// Next
///
/// Continuation over the remainder of the chain. Cloneable and
/// re-runnable: the retry handler re-enters the same continuation
/// with a fresh copy of the context for every attempt.
///

pub struct Next<E: EntityKind> {
    handlers: Arc<[Arc<dyn Handler<E>>]>,
    index: usize,
}

impl<E: EntityKind> Clone for Next<E> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
            index: self.index,
        }
    }
}

impl<E: EntityKind> Next<E> {
    pub async fn run(&self, ctx: PipelineContext) -> Result<Staged<E>, PipelineError> {
        match self.handlers.get(self.index) {
            Some(handler) => {
                let next = Self {
                    handlers: Arc::clone(&self.handlers),
                    index: self.index + 1,
                };
                handler.handle(ctx, next).await
            }
            None => Err(PipelineError::MissingStage("execute")),
        }
    }
}

///
/// QueryPipeline
///

pub struct QueryPipeline<E: EntityKind> {
    handlers: Arc<[Arc<dyn Handler<E>>]>,
}

impl<E: EntityKind> Clone for QueryPipeline<E> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl<E: EntityKind> QueryPipeline<E> {
    #[must_use]
    pub fn new(handlers: Vec<Arc<dyn Handler<E>>>) -> Self {
        Self {
            handlers: handlers.into(),
        }
    }

    /// The canonical chain over a store. Behavior switches (retry
    /// budget, logging, lazy references) come from the execution
    /// context's configuration at run time.
    #[must_use]
    pub fn standard(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(vec![
            Arc::new(handlers::ErrorHandlingHandler),
            Arc::new(handlers::ResolveHandler),
            Arc::new(handlers::LogHandler),
            Arc::new(handlers::ProxyHandler),
            Arc::new(handlers::TrackingHandler),
            Arc::new(handlers::ConvertHandler),
            Arc::new(handlers::ExecuteHandler::new(store)),
        ])
    }

    pub async fn run(&self, ctx: PipelineContext) -> Result<PipelineResult<E>, PipelineError> {
        let entry = Next {
            handlers: Arc::clone(&self.handlers),
            index: 0,
        };
        entry.run(ctx).await.map(|staged| staged.result)
    }
}
