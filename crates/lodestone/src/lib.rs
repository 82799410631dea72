//! Lodestone: a query provider that maps a host object-query model
//! onto a constrained schemaless document store.
//!
//! ## Crate layout
//! - `core`: value model, query plan and translators, resolution, the
//!   execution pipeline, the store boundary, and materialization.
//! - `error`: the public error taxonomy.
//! - `session`: the caller-facing session and fluent query builder.
//!
//! The `prelude` module mirrors the surface used by application code.

pub use lodestone_core as core;

pub mod error;
pub mod session;

pub use error::{Error, ErrorKind};
pub use session::{Query, Session};

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        core::{
            config::ProviderConfig,
            expr::ValueExpr,
            query::operator::{
                CompareOp, CompositeKind, FilterExpr, QueryOp, SelectBinding, SelectExpr,
                SelectSource, SubQuery,
            },
            query::plan::{AggregateKind, OrderDirection, ScalarKind},
            store::DocumentStore,
            traits::{DocRef, EntityKind},
            value::Value,
        },
        error::{Error, ErrorKind},
        session::{Query, Session},
    };
}
