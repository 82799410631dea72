use crate::{
    document::Document, materialize::ProjectionRow, pipeline::PipelineError, traits::EntityKind,
    value::Value,
};
use futures::stream::BoxStream;

/// Lazy entity sequence delivered by a streaming terminal.
pub type EntityStream<E> = BoxStream<'static, Result<E, PipelineError>>;

///
/// PipelineResult
///
/// Common currency between pipeline stages. Execution produces
/// `Documents` or `Scalar`; the convert stage reshapes `Documents`
/// into `Entities`, `Rows`, or a `Stream` depending on the query
/// kind, and everything upstream passes results through.
///

pub enum PipelineResult<E: EntityKind> {
    Empty,
    Scalar(Value),

    /// Root documents in query order. The full document pool travels
    /// in context metadata.
    Documents(Vec<Document>),

    Entities(Vec<E>),
    Rows(Vec<ProjectionRow>),
    Stream(EntityStream<E>),
}

impl<E: EntityKind> PipelineResult<E> {
    /// Name used in logs and stage-mismatch diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Scalar(_) => "scalar",
            Self::Documents(_) => "documents",
            Self::Entities(_) => "entities",
            Self::Rows(_) => "rows",
            Self::Stream(_) => "stream",
        }
    }
}

impl<E: EntityKind> std::fmt::Debug for PipelineResult<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(value) => write!(f, "Scalar({value})"),
            Self::Documents(docs) => write!(f, "Documents(len={})", docs.len()),
            Self::Entities(items) => write!(f, "Entities(len={})", items.len()),
            Self::Rows(rows) => write!(f, "Rows(len={})", rows.len()),
            Self::Stream(_) => write!(f, "Stream(..)"),
            Self::Empty => write!(f, "Empty"),
        }
    }
}
