//! Document Repository Domain
//!
//! A generic repository layer over a partitioned document store. One
//! `Repository<T>` per entity kind gives typed CRUD, filtered queries and
//! atomic bulk writes, and takes care of the cross-cutting rules every
//! document follows:
//!
//! - **Audit stamping**: created/updated/deleted timestamps and actors
//! - **Soft delete**: deleted documents stay stored but are never returned
//! - **Optimistic concurrency**: replaces are conditional on a version token
//! - **Atomic batches**: bulk writes commit all-or-nothing within one partition
//!
//! # Architecture
//!
//! ```text
//! Repository<T> --(DocumentStore port)--> InMemoryDocumentStore | hosted adapter
//!      |
//!      +-- Clock, ActorResolver (core_kernel)
//!      +-- PartitionKeyStrategy<T>
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use core_kernel::{SystemClock, SystemActor};
//! use domain_repository::{Field, InMemoryDocumentStore, Repository};
//!
//! let store = Arc::new(InMemoryDocumentStore::new());
//! let orders = Repository::<Order>::new(store, Arc::new(SystemClock), Arc::new(SystemActor));
//!
//! orders.create(&mut order).await?;
//! let open = orders.get_all(Some(Field::new("status").eq("open"))).await?;
//! ```

mod batch;

pub mod cancellation;
pub mod config;
pub mod entity;
pub mod error;
pub mod memory;
pub mod partition;
pub mod query;
pub mod repository;
pub mod store;

pub use cancellation::{CancellationSource, CancellationToken};
pub use config::RepositoryConfig;
pub use entity::{AuditFields, Entity, VersionToken};
pub use error::{RepositoryError, StoreError, StoreStatus};
pub use memory::{InMemoryDocumentStore, DEFAULT_MAX_BATCH_OPERATIONS};
pub use partition::{by_id, PartitionKey, PartitionKeyStrategy};
pub use query::{Field, Filter};
pub use repository::{Repository, UpdateOutcome};
pub use store::{
    BatchOperation, BatchOperationResult, BatchRequest, BatchResponse, ContinuationToken,
    DocumentStore, FeedPage, QueryRequest, StoredDocument, WriteResponse,
};
