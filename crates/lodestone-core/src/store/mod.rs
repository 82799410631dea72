//! The store boundary.
//!
//! `DocumentStore` is the narrow waist between the provider and a
//! concrete document database: it speaks only the native query model
//! (resolved filters, clause-list ordering, counts, cursors) and knows
//! nothing about entities, plans, or deferred expressions.

pub mod memory;

use crate::{
    document::Document,
    path::DocumentPath,
    query::{
        plan::{AggregateKind, OrderClause},
        resolve::{ResolvedFilter, ResolvedQuery},
    },
    value::Value,
};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error as ThisError;
use tokio_util::sync::CancellationToken;

///
/// StoreStatus
///
/// Status code of a failed store call, mirroring the usual RPC status
/// space. Transience drives the retry handler: unavailable,
/// deadline-exceeded, resource-exhausted, and aborted calls may
/// succeed when re-run; everything else is permanent.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreStatus {
    Unavailable,
    DeadlineExceeded,
    ResourceExhausted,
    Aborted,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    InvalidArgument,
    FailedPrecondition,
    Cancelled,
    Internal,
}

impl StoreStatus {
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Unavailable | Self::DeadlineExceeded | Self::ResourceExhausted | Self::Aborted
        )
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unavailable => "unavailable",
            Self::DeadlineExceeded => "deadline exceeded",
            Self::ResourceExhausted => "resource exhausted",
            Self::Aborted => "aborted",
            Self::NotFound => "not found",
            Self::AlreadyExists => "already exists",
            Self::PermissionDenied => "permission denied",
            Self::InvalidArgument => "invalid argument",
            Self::FailedPrecondition => "failed precondition",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// StoreError
///

#[derive(Clone, Debug, PartialEq, ThisError)]
#[error("store call failed ({status}): {message}")]
pub struct StoreError {
    pub status: StoreStatus,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(status: StoreStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.status.is_transient()
    }
}

///
/// WriteOp
///
/// Pass-through write statement. Writes are not planned; the session
/// serializes entities and commits batches directly.
///

#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Insert or replace the document at its path.
    Put(Document),
    Delete(DocumentPath),
}

///
/// AggregateRequest
///
/// One native aggregate over an already-filtered document set.
///

#[derive(Clone, Debug)]
pub struct AggregateRequest {
    pub kind: AggregateKind,
    pub field: Option<String>,
}

///
/// DocumentStore
///
/// Every call carries the invocation's cancellation token, so a store
/// client can abort in-flight work instead of running it to
/// completion. Implementations report an aborted call as
/// `StoreStatus::Cancelled`.
///

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Fetch one document by path. Missing documents are `Ok(None)`,
    /// not an error.
    async fn fetch(
        &self,
        path: &DocumentPath,
        cancel: &CancellationToken,
    ) -> Result<Option<Document>, StoreError>;

    /// Run a resolved collection query and return matching documents
    /// in query order.
    async fn run_query(
        &self,
        query: &ResolvedQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<Document>, StoreError>;

    /// Run a resolved query as a server-side aggregate.
    async fn run_aggregate(
        &self,
        query: &ResolvedQuery,
        request: &AggregateRequest,
        cancel: &CancellationToken,
    ) -> Result<Value, StoreError>;

    /// Fetch a parent's sub-resource children, filtered, ordered, and
    /// limited natively.
    async fn fetch_children(
        &self,
        parent: &DocumentPath,
        collection: &str,
        filters: &[ResolvedFilter],
        order: &[OrderClause],
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Document>, StoreError>;

    /// Aggregate over a parent's sub-resource children.
    async fn aggregate_children(
        &self,
        parent: &DocumentPath,
        collection: &str,
        filters: &[ResolvedFilter],
        request: &AggregateRequest,
        cancel: &CancellationToken,
    ) -> Result<Value, StoreError>;

    /// Commit a write batch atomically.
    async fn commit(
        &self,
        writes: Vec<WriteOp>,
        cancel: &CancellationToken,
    ) -> Result<(), StoreError>;
}
