//! Core runtime for Lodestone: the query plan and its translators, the
//! resolution and execution pipeline, the document store abstraction,
//! and entity materialization.
#![warn(unreachable_pub)] // too complex to adhere to right now

pub mod config;
pub mod context;
pub mod document;
pub mod expr;
pub mod materialize;
pub mod model;
pub mod path;
pub mod pipeline;
pub mod query;
pub mod serialize;
pub mod store;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, handlers, stores, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        document::Document,
        model::{EntityModel, NavigationModel, PropertyModel},
        path::DocumentPath,
        traits::{DocRef, EntityKind},
        value::Value,
    };
}
