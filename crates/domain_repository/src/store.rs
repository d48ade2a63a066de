//! Document store port
//!
//! The contract a partitioned, schema-less document database must meet
//! for `Repository` to sit on top of it:
//!
//! - point create/read/replace/delete by id + partition key
//! - replace/delete gated on a version token, failing with
//!   `StoreStatus::PreconditionFailed` on mismatch
//! - atomic multi-operation batches scoped to one partition key
//! - paged queries over a [`Filter`]
//!
//! The handle is shared and long-lived. Repositories hold it behind an
//! `Arc` and never shut it down.

use async_trait::async_trait;
use serde_json::Value;

use core_kernel::{DomainPort, HealthCheckable};

use crate::entity::VersionToken;
use crate::error::{StoreError, StoreStatus};
use crate::partition::PartitionKey;
use crate::query::Filter;

/// Key under which stores expose the version token inside a document body
pub const ETAG_FIELD: &str = "_etag";

/// A document as returned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub partition_key: PartitionKey,
    pub etag: VersionToken,
    /// Full body, including the `_etag` field
    pub body: Value,
}

/// Outcome of a successful single-document write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResponse {
    pub status: StoreStatus,
    pub etag: VersionToken,
}

/// One operation inside an atomic batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
    Create {
        id: String,
        body: Value,
    },
    Replace {
        id: String,
        body: Value,
        if_match: Option<VersionToken>,
    },
    Delete {
        id: String,
        if_match: Option<VersionToken>,
    },
}

impl BatchOperation {
    pub fn id(&self) -> &str {
        match self {
            BatchOperation::Create { id, .. }
            | BatchOperation::Replace { id, .. }
            | BatchOperation::Delete { id, .. } => id,
        }
    }
}

/// A set of operations the store applies entirely or not at all
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub partition_key: PartitionKey,
    pub operations: Vec<BatchOperation>,
}

impl BatchRequest {
    pub fn new(partition_key: PartitionKey) -> Self {
        Self {
            partition_key,
            operations: Vec::new(),
        }
    }

    pub fn create(mut self, id: impl Into<String>, body: Value) -> Self {
        self.operations.push(BatchOperation::Create {
            id: id.into(),
            body,
        });
        self
    }

    pub fn replace(mut self, id: impl Into<String>, body: Value, if_match: Option<VersionToken>) -> Self {
        self.operations.push(BatchOperation::Replace {
            id: id.into(),
            body,
            if_match,
        });
        self
    }

    pub fn delete(mut self, id: impl Into<String>, if_match: Option<VersionToken>) -> Self {
        self.operations.push(BatchOperation::Delete {
            id: id.into(),
            if_match,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Per-operation result inside a batch response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOperationResult {
    pub status: StoreStatus,
    /// New version token; absent for deletes and for failed batches
    pub etag: Option<VersionToken>,
}

/// Aggregate outcome of an atomic batch
///
/// When the batch fails, the offending operation carries its own status
/// and every other operation reports `FailedDependency`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResponse {
    pub status: StoreStatus,
    pub results: Vec<BatchOperationResult>,
}

impl BatchResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Index of the operation that caused the batch to fail
    pub fn failed_index(&self) -> Option<usize> {
        if self.is_success() {
            return None;
        }
        self.results.iter().position(|r| {
            !r.status.is_success() && r.status != StoreStatus::FailedDependency
        })
    }
}

/// Opaque cursor for resuming a paged query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken(pub String);

/// A single page request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub filter: Filter,
    /// Restrict to one partition; `None` fans out across all partitions
    pub partition_key: Option<PartitionKey>,
    pub continuation: Option<ContinuationToken>,
    pub max_item_count: usize,
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedPage {
    pub documents: Vec<StoredDocument>,
    /// `None` once the result set is exhausted
    pub continuation: Option<ContinuationToken>,
}

/// Connection to one partitioned document collection
#[async_trait]
pub trait DocumentStore: DomainPort + HealthCheckable {
    /// Inserts a new document; `StoreStatus::Conflict` if the id exists in the partition
    async fn create_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
        body: Value,
    ) -> Result<WriteResponse, StoreError>;

    /// Point read; `Ok(None)` when absent
    async fn read_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Replaces an existing document, optionally gated on its current token
    async fn replace_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
        body: Value,
        if_match: Option<&VersionToken>,
    ) -> Result<WriteResponse, StoreError>;

    /// Physically removes a document, optionally gated on its current token
    async fn delete_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
        if_match: Option<&VersionToken>,
    ) -> Result<(), StoreError>;

    /// Applies every operation of the batch atomically within its partition
    ///
    /// A rejected batch is reported through `BatchResponse::status`;
    /// `Err` is reserved for failures to submit the batch at all.
    async fn execute_batch(&self, batch: BatchRequest) -> Result<BatchResponse, StoreError>;

    /// Fetches one page of documents matching the request's filter
    async fn query(&self, request: &QueryRequest) -> Result<FeedPage, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_index_skips_dependents() {
        let response = BatchResponse {
            status: StoreStatus::Conflict,
            results: vec![
                BatchOperationResult { status: StoreStatus::FailedDependency, etag: None },
                BatchOperationResult { status: StoreStatus::Conflict, etag: None },
                BatchOperationResult { status: StoreStatus::FailedDependency, etag: None },
            ],
        };
        assert_eq!(response.failed_index(), Some(1));
    }

    #[test]
    fn test_successful_batch_has_no_failed_index() {
        let response = BatchResponse {
            status: StoreStatus::Ok,
            results: vec![BatchOperationResult {
                status: StoreStatus::Created,
                etag: Some(VersionToken::new("t")),
            }],
        };
        assert_eq!(response.failed_index(), None);
    }

    #[test]
    fn test_batch_request_builder() {
        let batch = BatchRequest::new(PartitionKey::from("p"))
            .create("a", Value::Null)
            .replace("b", Value::Null, None)
            .delete("c", None);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.operations[2].id(), "c");
    }
}
