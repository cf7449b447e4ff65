pub mod memory;

use crate::core::{Document, PartitionKey};
use crate::query::Predicate;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub use memory::{InMemoryBackend, InMemoryRemoteStore, RequestLog};

/// Status codes a document backend reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCode {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl fmt::Display for BackendCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Backend-specific failure, translated into [`crate::StoreError`] by the executor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct BackendError {
    pub code: BackendCode,
    pub message: String,
}

impl BackendError {
    pub fn new(code: BackendCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// One batch of query results.
///
/// A page holding fewer items than were requested signals the end of data.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub requested: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, requested: usize) -> Self {
        Self { items, requested }
    }

    pub fn empty(requested: usize) -> Self {
        Self::new(Vec::new(), requested)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_short(&self) -> bool {
        self.items.len() < self.requested
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Remote, per-user-partitioned document store.
///
/// `start_after` is a continuation cursor: the query resumes strictly after
/// that document's position in the requested ordering. `get_by_ids` must
/// not be called with more ids than the backend's value-in-set ceiling;
/// the executor guarantees this.
#[async_trait]
pub trait RemoteStore<T: Document>: Send + Sync {
    async fn query(
        &self,
        predicates: &[Predicate],
        partition_key: &PartitionKey,
        start_after: Option<&T>,
    ) -> Result<Page<T>, BackendError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<T>, BackendError>;

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<T>, BackendError>;
}
