//! Recording Store Wrapper
//!
//! Wraps any `DocumentStore` and counts the calls that reach it, so tests
//! can assert that an operation did (or did not) touch the store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable};
use domain_repository::{
    BatchRequest, BatchResponse, DocumentStore, FeedPage, PartitionKey, QueryRequest, StoreError,
    StoredDocument, VersionToken, WriteResponse,
};
use serde_json::Value;

/// Per-operation call counters
#[derive(Debug, Default)]
pub struct CallCounts {
    pub creates: AtomicUsize,
    pub reads: AtomicUsize,
    pub replaces: AtomicUsize,
    pub deletes: AtomicUsize,
    pub batches: AtomicUsize,
    pub queries: AtomicUsize,
}

/// Store wrapper that counts calls and remembers submitted batches
pub struct CountingStore {
    inner: Arc<dyn DocumentStore>,
    counts: CallCounts,
    batches: Mutex<Vec<(PartitionKey, usize)>>,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            counts: CallCounts::default(),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn counts(&self) -> &CallCounts {
        &self.counts
    }

    /// Total number of calls forwarded to the inner store
    pub fn total_calls(&self) -> usize {
        let c = &self.counts;
        [
            &c.creates, &c.reads, &c.replaces, &c.deletes, &c.batches, &c.queries,
        ]
        .iter()
        .map(|n| n.load(Ordering::SeqCst))
        .sum()
    }

    pub fn batch_count(&self) -> usize {
        self.counts.batches.load(Ordering::SeqCst)
    }

    /// Partition key and operation count of every batch submitted so far
    pub fn submitted_batches(&self) -> Vec<(PartitionKey, usize)> {
        self.batches.lock().unwrap().clone()
    }
}

impl DomainPort for CountingStore {}

#[async_trait]
impl HealthCheckable for CountingStore {
    async fn health_check(&self) -> HealthCheckResult {
        self.inner.health_check().await
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn create_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
        body: Value,
    ) -> Result<WriteResponse, StoreError> {
        self.counts.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_item(partition_key, id, body).await
    }

    async fn read_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.counts.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_item(partition_key, id).await
    }

    async fn replace_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
        body: Value,
        if_match: Option<&VersionToken>,
    ) -> Result<WriteResponse, StoreError> {
        self.counts.replaces.fetch_add(1, Ordering::SeqCst);
        self.inner.replace_item(partition_key, id, body, if_match).await
    }

    async fn delete_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
        if_match: Option<&VersionToken>,
    ) -> Result<(), StoreError> {
        self.counts.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_item(partition_key, id, if_match).await
    }

    async fn execute_batch(&self, batch: BatchRequest) -> Result<BatchResponse, StoreError> {
        self.counts.batches.fetch_add(1, Ordering::SeqCst);
        self.batches
            .lock()
            .unwrap()
            .push((batch.partition_key.clone(), batch.len()));
        self.inner.execute_batch(batch).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<FeedPage, StoreError> {
        self.counts.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(request).await
    }
}
