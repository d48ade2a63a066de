//! Store and repository error types
//!
//! `StoreError` is what a store adapter reports at the port boundary.
//! `RepositoryError` is what callers of a repository see: the store's
//! status codes are translated into distinct, typed outcomes so higher
//! layers can decide on retry and backoff themselves.

use std::fmt;

use thiserror::Error;

use crate::partition::PartitionKey;

/// Status reported by the document store for a single operation or batch
///
/// Mirrors the HTTP-style codes that hosted document databases return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreStatus {
    Ok,
    Created,
    NoContent,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    PreconditionFailed,
    RequestEntityTooLarge,
    FailedDependency,
    TooManyRequests,
    InternalServerError,
    ServiceUnavailable,
    RequestTimeout,
}

impl StoreStatus {
    /// Numeric status code
    pub fn code(&self) -> u16 {
        match self {
            StoreStatus::Ok => 200,
            StoreStatus::Created => 201,
            StoreStatus::NoContent => 204,
            StoreStatus::BadRequest => 400,
            StoreStatus::Unauthorized => 401,
            StoreStatus::Forbidden => 403,
            StoreStatus::NotFound => 404,
            StoreStatus::RequestTimeout => 408,
            StoreStatus::Conflict => 409,
            StoreStatus::PreconditionFailed => 412,
            StoreStatus::RequestEntityTooLarge => 413,
            StoreStatus::FailedDependency => 424,
            StoreStatus::TooManyRequests => 429,
            StoreStatus::InternalServerError => 500,
            StoreStatus::ServiceUnavailable => 503,
        }
    }

    /// Returns true for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code())
    }

    /// Returns true if the same request may succeed when resubmitted later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreStatus::TooManyRequests
                | StoreStatus::ServiceUnavailable
                | StoreStatus::RequestTimeout
        )
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.code(), self)
    }
}

/// Failure reported by a store adapter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("store returned {status}: {message}")]
pub struct StoreError {
    pub status: StoreStatus,
    pub message: String,
}

impl StoreError {
    pub fn new(status: StoreStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(id: impl fmt::Display) -> Self {
        Self::new(StoreStatus::NotFound, format!("document '{}' does not exist", id))
    }

    pub fn conflict(id: impl fmt::Display) -> Self {
        Self::new(StoreStatus::Conflict, format!("document '{}' already exists", id))
    }

    pub fn precondition_failed(id: impl fmt::Display) -> Self {
        Self::new(
            StoreStatus::PreconditionFailed,
            format!("version token of document '{}' does not match", id),
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StoreStatus::BadRequest, message)
    }

    pub fn is_precondition_failed(&self) -> bool {
        self.status == StoreStatus::PreconditionFailed
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StoreStatus::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.status == StoreStatus::Conflict
    }
}

/// Errors surfaced by `Repository` operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A write targeted a document that does not exist (or is hidden)
    #[error("{kind} with id '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// A create collided with an existing document
    #[error("{kind} with id '{id}' already exists")]
    AlreadyExists { kind: &'static str, id: String },

    /// The caller's version token no longer matches the stored document
    #[error("Concurrency conflict: {kind} '{id}' was modified by another writer")]
    ConcurrencyConflict { kind: &'static str, id: String },

    /// A conditional write was attempted without a version token
    #[error("{kind} '{id}' has no version token; read it before writing")]
    MissingVersionToken { kind: &'static str, id: String },

    /// An atomic batch was rejected as a whole
    #[error("Batch failed with status {status} at operation {failed_index:?}")]
    Batch {
        status: StoreStatus,
        failed_index: Option<usize>,
    },

    /// Entities in one batch resolved to different partition keys
    #[error("Batch spans partitions: expected '{expected}', entity {index} resolved to '{found}'")]
    MixedPartitions {
        expected: PartitionKey,
        found: PartitionKey,
        index: usize,
    },

    /// A batch exceeded the configured operation limit
    #[error("Batch of {size} operations exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// An entity could not be converted to or from its document form
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The operation was abandoned; whether the store applied it is unknown
    #[error("Operation cancelled; outcome unknown")]
    Cancelled,

    /// The operation exceeded its deadline; whether the store applied it is unknown
    #[error("Operation timed out after {after_ms}ms; outcome unknown")]
    Timeout { after_ms: u64 },

    /// Any other store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RepositoryError {
    pub fn not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        RepositoryError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn concurrency_conflict(kind: &'static str, id: impl fmt::Display) -> Self {
        RepositoryError::ConcurrencyConflict {
            kind,
            id: id.to_string(),
        }
    }

    /// Checks if this error is an optimistic concurrency failure
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, RepositoryError::ConcurrencyConflict { .. })
    }

    /// Checks if this error indicates a missing document
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }

    /// Checks if the write outcome is unknown and must be confirmed by re-reading
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(
            self,
            RepositoryError::Cancelled | RepositoryError::Timeout { .. }
        )
    }

    /// Checks if a later resubmission may succeed without caller changes
    pub fn is_transient(&self) -> bool {
        match self {
            RepositoryError::Store(e) => e.status.is_transient(),
            RepositoryError::Batch { status, .. } => status.is_transient(),
            RepositoryError::Timeout { .. } => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(error: serde_json::Error) -> Self {
        RepositoryError::Serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StoreStatus::PreconditionFailed.code(), 412);
        assert_eq!(StoreStatus::FailedDependency.code(), 424);
        assert!(StoreStatus::Created.is_success());
        assert!(!StoreStatus::Conflict.is_success());
    }

    #[test]
    fn test_store_error_predicates() {
        assert!(StoreError::precondition_failed("x").is_precondition_failed());
        assert!(StoreError::not_found("x").is_not_found());
        assert!(StoreError::conflict("x").is_conflict());
    }

    #[test]
    fn test_transient_classification() {
        let throttled: RepositoryError =
            StoreError::new(StoreStatus::TooManyRequests, "slow down").into();
        assert!(throttled.is_transient());

        let conflict = RepositoryError::concurrency_conflict("Order", "abc");
        assert!(!conflict.is_transient());
        assert!(conflict.is_concurrency_conflict());
    }

    #[test]
    fn test_outcome_unknown() {
        assert!(RepositoryError::Cancelled.is_outcome_unknown());
        assert!(RepositoryError::Timeout { after_ms: 10 }.is_outcome_unknown());
        assert!(!RepositoryError::not_found("Order", "abc").is_outcome_unknown());
    }
}
