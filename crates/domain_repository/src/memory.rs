//! In-memory document store
//!
//! A complete implementation of the [`DocumentStore`] port held in process
//! memory: version tokens on every write, precondition checks, atomic
//! single-partition batches and paged queries. Intended for development
//! and tests; nothing is persisted.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use domain_repository::{InMemoryDocumentStore, Repository};
//!
//! let store = Arc::new(InMemoryDocumentStore::new());
//! let orders = Repository::<Order>::new(store.clone(), clock, actor);
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable};

use crate::entity::VersionToken;
use crate::error::{StoreError, StoreStatus};
use crate::partition::PartitionKey;
use crate::query::ID_FIELD;
use crate::store::{
    BatchOperation, BatchOperationResult, BatchRequest, BatchResponse, ContinuationToken,
    DocumentStore, FeedPage, QueryRequest, StoredDocument, WriteResponse, ETAG_FIELD,
};

/// Operation limit most hosted document databases enforce per batch
pub const DEFAULT_MAX_BATCH_OPERATIONS: usize = 100;

type Partition = BTreeMap<String, StoredDocument>;

/// In-memory partitioned document collection
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    partitions: RwLock<BTreeMap<PartitionKey, Partition>>,
    max_batch_operations: usize,
    latency: Option<Duration>,
    injected_failures: Mutex<Vec<StoreError>>,
    request_count: AtomicU64,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(BTreeMap::new()),
            max_batch_operations: DEFAULT_MAX_BATCH_OPERATIONS,
            latency: None,
            injected_failures: Mutex::new(Vec::new()),
            request_count: AtomicU64::new(0),
        }
    }

    /// Sets how many operations a single batch may carry
    pub fn max_batch_operations(mut self, max: usize) -> Self {
        self.max_batch_operations = max;
        self
    }

    /// Delays every request, simulating a network round trip
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next request fail with `error` instead of executing
    ///
    /// Queued failures are consumed in order, one per request.
    pub fn inject_failure(&self, error: StoreError) {
        if let Ok(mut failures) = self.injected_failures.lock() {
            failures.push(error);
        }
    }

    /// Number of requests received, including rejected ones
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Number of documents currently stored, soft-deleted ones included
    pub fn document_count(&self) -> usize {
        self.partitions
            .read()
            .map(|p| p.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    /// Raw access for assertions that must see past the soft-delete filter
    pub fn raw_document(&self, partition_key: &PartitionKey, id: &str) -> Option<StoredDocument> {
        self.partitions
            .read()
            .ok()?
            .get(partition_key)?
            .get(id)
            .cloned()
    }

    async fn begin_request(&self) -> Result<(), StoreError> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut failures = self
            .injected_failures
            .lock()
            .map_err(|_| poisoned())?;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.remove(0))
        }
    }

    fn next_etag() -> VersionToken {
        VersionToken::new(format!("\"{}\"", Uuid::new_v4()))
    }

    fn seal(
        partition_key: &PartitionKey,
        id: &str,
        mut body: Value,
    ) -> Result<StoredDocument, StoreError> {
        let etag = Self::next_etag();
        let object = body
            .as_object_mut()
            .ok_or_else(|| StoreError::bad_request(format!("document '{}' is not a JSON object", id)))?;
        match object.get(ID_FIELD).and_then(Value::as_str) {
            Some(body_id) if body_id == id => {}
            _ => {
                return Err(StoreError::bad_request(format!(
                    "document body id does not match '{}'",
                    id
                )))
            }
        }
        object.insert(ETAG_FIELD.to_string(), Value::String(etag.as_str().to_string()));
        Ok(StoredDocument {
            id: id.to_string(),
            partition_key: partition_key.clone(),
            etag,
            body,
        })
    }

    fn check_precondition(
        current: &StoredDocument,
        if_match: Option<&VersionToken>,
    ) -> Result<(), StoreError> {
        match if_match {
            Some(expected) if *expected != current.etag => {
                Err(StoreError::precondition_failed(&current.id))
            }
            _ => Ok(()),
        }
    }

    fn apply_create(
        partition: &mut Partition,
        partition_key: &PartitionKey,
        id: &str,
        body: Value,
    ) -> Result<WriteResponse, StoreError> {
        if partition.contains_key(id) {
            return Err(StoreError::conflict(id));
        }
        let document = Self::seal(partition_key, id, body)?;
        let etag = document.etag.clone();
        partition.insert(id.to_string(), document);
        Ok(WriteResponse {
            status: StoreStatus::Created,
            etag,
        })
    }

    fn apply_replace(
        partition: &mut Partition,
        partition_key: &PartitionKey,
        id: &str,
        body: Value,
        if_match: Option<&VersionToken>,
    ) -> Result<WriteResponse, StoreError> {
        let current = partition.get(id).ok_or_else(|| StoreError::not_found(id))?;
        Self::check_precondition(current, if_match)?;
        let document = Self::seal(partition_key, id, body)?;
        let etag = document.etag.clone();
        partition.insert(id.to_string(), document);
        Ok(WriteResponse {
            status: StoreStatus::Ok,
            etag,
        })
    }

    fn apply_delete(
        partition: &mut Partition,
        id: &str,
        if_match: Option<&VersionToken>,
    ) -> Result<(), StoreError> {
        let current = partition.get(id).ok_or_else(|| StoreError::not_found(id))?;
        Self::check_precondition(current, if_match)?;
        partition.remove(id);
        Ok(())
    }

    fn apply_batch_operation(
        partition: &mut Partition,
        partition_key: &PartitionKey,
        operation: BatchOperation,
    ) -> Result<BatchOperationResult, StoreError> {
        match operation {
            BatchOperation::Create { id, body } => {
                Self::apply_create(partition, partition_key, &id, body).map(|w| {
                    BatchOperationResult {
                        status: w.status,
                        etag: Some(w.etag),
                    }
                })
            }
            BatchOperation::Replace { id, body, if_match } => {
                Self::apply_replace(partition, partition_key, &id, body, if_match.as_ref()).map(
                    |w| BatchOperationResult {
                        status: w.status,
                        etag: Some(w.etag),
                    },
                )
            }
            BatchOperation::Delete { id, if_match } => {
                Self::apply_delete(partition, &id, if_match.as_ref()).map(|_| {
                    BatchOperationResult {
                        status: StoreStatus::NoContent,
                        etag: None,
                    }
                })
            }
        }
    }
}

fn poisoned() -> StoreError {
    StoreError::new(StoreStatus::InternalServerError, "lock poisoned")
}

fn decode_continuation(token: Option<&ContinuationToken>) -> Result<usize, StoreError> {
    match token {
        None => Ok(0),
        Some(ContinuationToken(raw)) => raw
            .parse()
            .map_err(|_| StoreError::bad_request(format!("malformed continuation token '{}'", raw))),
    }
}

impl DomainPort for InMemoryDocumentStore {}

#[async_trait]
impl HealthCheckable for InMemoryDocumentStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let (status, message) = match self.partitions.read() {
            Ok(partitions) => (
                AdapterHealth::Healthy,
                Some(format!("{} partitions", partitions.len())),
            ),
            Err(_) => (AdapterHealth::Unhealthy, Some("lock poisoned".to_string())),
        };

        HealthCheckResult {
            adapter_id: "in-memory-document-store".to_string(),
            status,
            latency_ms: start.elapsed().as_millis() as u64,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
        body: Value,
    ) -> Result<WriteResponse, StoreError> {
        self.begin_request().await?;
        let mut partitions = self.partitions.write().map_err(|_| poisoned())?;
        let partition = partitions.entry(partition_key.clone()).or_default();
        Self::apply_create(partition, partition_key, id, body)
    }

    async fn read_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.begin_request().await?;
        let partitions = self.partitions.read().map_err(|_| poisoned())?;
        Ok(partitions.get(partition_key).and_then(|p| p.get(id)).cloned())
    }

    async fn replace_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
        body: Value,
        if_match: Option<&VersionToken>,
    ) -> Result<WriteResponse, StoreError> {
        self.begin_request().await?;
        let mut partitions = self.partitions.write().map_err(|_| poisoned())?;
        let partition = partitions
            .get_mut(partition_key)
            .ok_or_else(|| StoreError::not_found(id))?;
        Self::apply_replace(partition, partition_key, id, body, if_match)
    }

    async fn delete_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
        if_match: Option<&VersionToken>,
    ) -> Result<(), StoreError> {
        self.begin_request().await?;
        let mut partitions = self.partitions.write().map_err(|_| poisoned())?;
        let partition = partitions
            .get_mut(partition_key)
            .ok_or_else(|| StoreError::not_found(id))?;
        Self::apply_delete(partition, id, if_match)?;
        if partition.is_empty() {
            partitions.remove(partition_key);
        }
        Ok(())
    }

    #[instrument(skip(self, batch), fields(partition_key = %batch.partition_key, operations = batch.len()))]
    async fn execute_batch(&self, batch: BatchRequest) -> Result<BatchResponse, StoreError> {
        self.begin_request().await?;
        if batch.len() > self.max_batch_operations {
            return Err(StoreError::new(
                StoreStatus::BadRequest,
                format!(
                    "batch carries {} operations, limit is {}",
                    batch.len(),
                    self.max_batch_operations
                ),
            ));
        }

        let mut partitions = self.partitions.write().map_err(|_| poisoned())?;

        // Work on a copy so a failing operation leaves the partition untouched.
        let mut staged = partitions
            .get(&batch.partition_key)
            .cloned()
            .unwrap_or_default();
        let total = batch.len();
        let mut results = Vec::with_capacity(total);

        for (index, operation) in batch.operations.into_iter().enumerate() {
            match Self::apply_batch_operation(&mut staged, &batch.partition_key, operation) {
                Ok(result) => results.push(result),
                Err(error) => {
                    debug!(index, status = %error.status, "batch rejected");
                    let results = (0..total)
                        .map(|i| BatchOperationResult {
                            status: if i == index {
                                error.status
                            } else {
                                StoreStatus::FailedDependency
                            },
                            etag: None,
                        })
                        .collect();
                    return Ok(BatchResponse {
                        status: error.status,
                        results,
                    });
                }
            }
        }

        if staged.is_empty() {
            partitions.remove(&batch.partition_key);
        } else {
            partitions.insert(batch.partition_key, staged);
        }

        Ok(BatchResponse {
            status: StoreStatus::Ok,
            results,
        })
    }

    #[instrument(skip(self, request), fields(partition_key = ?request.partition_key))]
    async fn query(&self, request: &QueryRequest) -> Result<FeedPage, StoreError> {
        self.begin_request().await?;
        if request.max_item_count == 0 {
            return Err(StoreError::bad_request("max_item_count must be positive"));
        }
        let offset = decode_continuation(request.continuation.as_ref())?;
        let partitions = self.partitions.read().map_err(|_| poisoned())?;

        let scoped: Box<dyn Iterator<Item = &Partition> + '_> = match &request.partition_key {
            Some(key) => Box::new(partitions.get(key).into_iter()),
            None => Box::new(partitions.values()),
        };

        let mut matching = scoped
            .flat_map(BTreeMap::values)
            .filter(|doc| request.filter.matches(&doc.body))
            .skip(offset);

        let documents: Vec<StoredDocument> = matching
            .by_ref()
            .take(request.max_item_count)
            .cloned()
            .collect();
        let continuation = if matching.next().is_some() {
            Some(ContinuationToken((offset + documents.len()).to_string()))
        } else {
            None
        };

        debug!(returned = documents.len(), has_more = continuation.is_some(), "query page served");
        Ok(FeedPage {
            documents,
            continuation,
        })
    }
}
