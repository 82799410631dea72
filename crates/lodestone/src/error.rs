use lodestone_core::{
    materialize::DeserializeError,
    pipeline::PipelineError,
    query::translate::TranslateError,
    store::{StoreError, StoreStatus},
};
use thiserror::Error as ThisError;

///
/// Error
///
/// Public error type with a stable class taxonomy. Internal errors
/// carry their full chain in the message; callers branch on `kind`.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn not_unique(entity: &'static str) -> Self {
        Self::new(
            ErrorKind::NotUnique,
            format!("query for one '{entity}' matched more than one document"),
        )
    }

    pub(crate) fn unexpected_shape(expected: &'static str, found: &'static str) -> Self {
        Self::new(
            ErrorKind::Internal,
            format!("pipeline produced a {found} result where {expected} was expected"),
        )
    }
}

///
/// ErrorKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The operator chain cannot be expressed as a native query.
    Unsupported,

    /// The query was expressible but could not be bound or validated.
    Invalid,

    /// A single-result terminal matched more than one document.
    NotUnique,

    /// The store call failed with this status.
    Store(StoreStatus),

    /// Documents came back but could not become entities.
    Materialize,

    Cancelled,
    Internal,
}

impl From<TranslateError> for Error {
    fn from(err: TranslateError) -> Self {
        Self::new(ErrorKind::Unsupported, err.to_string())
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::new(ErrorKind::Store(err.status), err.to_string())
    }
}

impl From<DeserializeError> for Error {
    fn from(err: DeserializeError) -> Self {
        Self::new(ErrorKind::Materialize, err.to_string())
    }
}

impl From<PipelineError> for Error {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        Self::new(classify(&err), message)
    }
}

fn classify(err: &PipelineError) -> ErrorKind {
    match err {
        PipelineError::Described { source, .. } => classify(source),
        PipelineError::Resolve(_) => ErrorKind::Invalid,
        PipelineError::Store(e) | PipelineError::RetriesExhausted { source: e, .. } => {
            ErrorKind::Store(e.status)
        }
        PipelineError::Deserialize(_) => ErrorKind::Materialize,
        PipelineError::Cancelled => ErrorKind::Cancelled,
        PipelineError::MissingStage(_) => ErrorKind::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn described_errors_classify_by_their_source() {
        let inner = PipelineError::Store(StoreError::new(StoreStatus::Unavailable, "down"));
        let described = PipelineError::Described {
            query: "query Products".into(),
            source: Box::new(inner),
        };

        let error: Error = described.into();
        assert_eq!(error.kind, ErrorKind::Store(StoreStatus::Unavailable));
        // The query description survives into the message.
        assert!(error.message.contains("query Products"));
    }
}
