use crate::remote::{BackendCode, BackendError};
use thiserror::Error;

/// Errors surfaced by the executor, the refresh orchestrator and the pager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown store error: {0}")]
    Unknown(String),

    /// Raised locally when a cancel token fires between page or chunk requests.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl StoreError {
    /// Only network-class failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        let message = err.message;
        match err.code {
            BackendCode::PermissionDenied | BackendCode::Unauthenticated => {
                Self::PermissionDenied(message)
            }
            BackendCode::NotFound => Self::NotFound(message),
            BackendCode::AlreadyExists => Self::AlreadyExists(message),
            BackendCode::InvalidArgument
            | BackendCode::FailedPrecondition
            | BackendCode::OutOfRange => Self::InvalidArgument(message),
            BackendCode::Unavailable | BackendCode::DeadlineExceeded | BackendCode::Aborted => {
                Self::Unavailable(message)
            }
            BackendCode::Cancelled => Self::Cancelled(message),
            BackendCode::Unknown
            | BackendCode::ResourceExhausted
            | BackendCode::Unimplemented
            | BackendCode::Internal
            | BackendCode::DataLoss => Self::Unknown(message),
        }
    }
}

impl From<QueryBuildError> for StoreError {
    fn from(err: QueryBuildError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Construction-time failures of a query descriptor.
///
/// These indicate a call site that built an invalid query, not a runtime
/// condition of the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryBuildError {
    #[error("query for '{0}' has no partition key")]
    MissingPartitionKey(String),

    #[error("partition key must not be empty")]
    EmptyPartitionKey,

    #[error("limit {limit} is outside 1..={ceiling}")]
    LimitOutOfRange { limit: usize, ceiling: usize },

    #[error("predicate on '{field}' carries {len} values, ceiling is {ceiling}")]
    SetTooLarge {
        field: String,
        len: usize,
        ceiling: usize,
    },
}

/// Invalid [`crate::DataConfig`] values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("page size must be at least 1")]
    ZeroPageSize,

    #[error("capacity {capacity} of '{entity}' is below the page size {page_size}")]
    CapacityBelowPageSize {
        entity: String,
        capacity: usize,
        page_size: usize,
    },

    #[error("config parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_codes_map_into_taxonomy() {
        let cases = [
            (BackendCode::Unauthenticated, "PermissionDenied"),
            (BackendCode::DeadlineExceeded, "Unavailable"),
            (BackendCode::Aborted, "Unavailable"),
            (BackendCode::FailedPrecondition, "InvalidArgument"),
            (BackendCode::Internal, "Unknown"),
            (BackendCode::NotFound, "NotFound"),
            (BackendCode::AlreadyExists, "AlreadyExists"),
        ];

        for (code, expected) in cases {
            let mapped = StoreError::from(BackendError::new(code, "boom"));
            let name = match mapped {
                StoreError::PermissionDenied(_) => "PermissionDenied",
                StoreError::NotFound(_) => "NotFound",
                StoreError::AlreadyExists(_) => "AlreadyExists",
                StoreError::InvalidArgument(_) => "InvalidArgument",
                StoreError::Unavailable(_) => "Unavailable",
                StoreError::Unknown(_) => "Unknown",
                StoreError::Cancelled(_) => "Cancelled",
            };
            assert_eq!(name, expected, "code {:?}", code);
        }
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(StoreError::Unavailable("offline".into()).is_retryable());
        assert!(!StoreError::Unknown("x".into()).is_retryable());
        assert!(!StoreError::PermissionDenied("x".into()).is_retryable());
    }

    #[test]
    fn test_build_error_surfaces_as_invalid_argument() {
        let err: StoreError = QueryBuildError::EmptyPartitionKey.into();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }
}
