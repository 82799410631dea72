//! Document-to-result materialization.
//!
//! `deserialize` turns raw documents back into typed entities through
//! the declared constructor shapes; `projection` builds shaped rows
//! for select queries. Both work off the document pool one pipeline
//! invocation accumulated, so navigation assembly never re-fetches.

pub mod deserialize;
pub mod projection;

#[cfg(test)]
mod tests;

pub use deserialize::{deserialize, deserialize_children};
pub use projection::{materialize_rows, ProjectionRow};

use crate::path::PathError;
use thiserror::Error as ThisError;

///
/// DeserializeError
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum DeserializeError {
    #[error("no declared constructor of '{entity}' is satisfiable from the document")]
    NoUsableConstructor { entity: &'static str },

    #[error("constructor of '{entity}' requires '{property}' which the document does not carry")]
    MissingConstructorValue {
        entity: &'static str,
        property: String,
    },

    #[error("'{entity}.{property}' expected {expected}, found {found}")]
    TypeMismatch {
        entity: &'static str,
        property: String,
        expected: &'static str,
        found: String,
    },

    #[error("'{value}' is not a variant of the enum behind '{entity}.{property}'")]
    UnknownEnumVariant {
        entity: &'static str,
        property: String,
        value: String,
    },

    #[error("'{entity}' has no settable property '{property}'")]
    UnknownProperty {
        entity: &'static str,
        property: String,
    },

    #[error("'{entity}' has no navigation '{navigation}'")]
    UnknownNavigation {
        entity: &'static str,
        navigation: String,
    },

    #[error("primary key of '{entity}' must be text, found {value}")]
    InvalidPrimaryKey {
        entity: &'static str,
        value: String,
    },

    #[error("invalid reference path: {0}")]
    Path(#[from] PathError),

    #[error("document '{path}' could not become a '{entity}': {source}")]
    Document {
        path: String,
        entity: &'static str,
        #[source]
        source: Box<DeserializeError>,
    },
}

impl DeserializeError {
    /// Wrap with the originating document path, once, at the outermost
    /// call. Nested child failures keep their own path.
    #[must_use]
    pub fn at(self, path: &crate::path::DocumentPath, entity: &'static str) -> Self {
        match self {
            Self::Document { .. } => self,
            other => Self::Document {
                path: path.to_string(),
                entity,
                source: Box::new(other),
            },
        }
    }
}
