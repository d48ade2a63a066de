//! Generic document repository
//!
//! `Repository<T>` is the typed CRUD and query facade for one entity kind
//! over one shared document collection. It:
//!
//! - stamps audit fields from the injected `Clock` and `ActorResolver`
//! - hides soft-deleted documents from every read path
//! - gates replaces on the entity's version token and reports mismatches
//!   as `RepositoryError::ConcurrencyConflict`
//! - submits bulk writes as single-partition atomic batches
//!
//! Nothing is retried here; each failure reaches the caller as a typed
//! error so the layer above can choose its own retry policy.
//!
//! # Example
//!
//! ```rust,ignore
//! let orders = Repository::<Order>::new(store, Arc::new(SystemClock), actor)
//!     .with_partition_key(|order: &Order| PartitionKey::from(order.customer_id));
//!
//! let mut order = Order::new(customer_id);
//! orders.create(&mut order).await?;
//!
//! order.status = OrderStatus::Shipped;
//! match orders.update(&mut order).await {
//!     Err(e) if e.is_concurrency_conflict() => { /* re-read and retry */ }
//!     other => other?,
//! };
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use core_kernel::{ActorResolver, Clock, EntityId, HealthCheckResult};

use crate::batch;
use crate::cancellation::CancellationToken;
use crate::config::RepositoryConfig;
use crate::entity::{to_document, AuditFields, Entity, VersionToken};
use crate::error::{RepositoryError, StoreError};
use crate::partition::{default_strategy, PartitionKey, PartitionKeyStrategy};
use crate::query::{Field, Filter, ID_FIELD, KIND_FIELD};
use crate::store::{BatchRequest, DocumentStore, FeedPage, QueryRequest, StoredDocument};

/// Result of a conditional replace, with conflicts as ordinary values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The write landed; the entity now carries this token
    Updated(VersionToken),
    /// The stored document changed since the entity was read
    Conflict,
    /// The document no longer exists or is soft-deleted
    NotFound,
}

impl UpdateOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, UpdateOutcome::Updated(_))
    }

    /// Converts conflict and not-found into their `RepositoryError` forms
    pub fn into_result(
        self,
        kind: &'static str,
        id: EntityId,
    ) -> Result<VersionToken, RepositoryError> {
        match self {
            UpdateOutcome::Updated(token) => Ok(token),
            UpdateOutcome::Conflict => Err(RepositoryError::concurrency_conflict(kind, id)),
            UpdateOutcome::NotFound => Err(RepositoryError::not_found(kind, id)),
        }
    }
}

/// Typed repository for one entity kind
pub struct Repository<T: Entity> {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    actor: Arc<dyn ActorResolver>,
    partition_key: PartitionKeyStrategy<T>,
    config: RepositoryConfig,
    cancellation: Option<CancellationToken>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            actor: Arc::clone(&self.actor),
            partition_key: Arc::clone(&self.partition_key),
            config: self.config.clone(),
            cancellation: self.cancellation.clone(),
        }
    }
}

impl<T: Entity> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("kind", &T::KIND)
            .field("config", &self.config)
            .field("cancellable", &self.cancellation.is_some())
            .finish()
    }
}

impl<T: Entity> Repository<T> {
    /// Creates a repository over a shared store handle
    ///
    /// Partition keys default to the entity id.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        actor: Arc<dyn ActorResolver>,
    ) -> Self {
        Self {
            store,
            clock,
            actor,
            partition_key: default_strategy::<T>(),
            config: RepositoryConfig::default(),
            cancellation: None,
        }
    }

    /// Replaces the partition-key derivation
    pub fn with_partition_key<F>(mut self, strategy: F) -> Self
    where
        F: Fn(&T) -> PartitionKey + Send + Sync + 'static,
    {
        self.partition_key = Arc::new(strategy);
        self
    }

    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns a handle whose store calls are abandoned once `token` fires
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        let mut bound = self.clone();
        bound.cancellation = Some(token);
        bound
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn partition_key_for(&self, entity: &T) -> PartitionKey {
        (self.partition_key)(entity)
    }

    /// Reports the health of the underlying store adapter
    pub async fn health_check(&self) -> HealthCheckResult {
        self.store.health_check().await
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Inserts a new document for `entity`
    ///
    /// Audit fields are stamped before the write and the returned version
    /// token is stored on the entity.
    #[instrument(skip(self, entity), fields(kind = T::KIND, id = %entity.id()))]
    pub async fn create(&self, entity: &mut T) -> Result<VersionToken, RepositoryError> {
        let previous = entity.audit().clone();
        entity
            .audit_mut()
            .stamp_created(self.clock.now(), self.actor.current_actor());

        let result = self.submit_create(entity).await;
        if result.is_err() {
            *entity.audit_mut() = previous;
        }
        result
    }

    async fn submit_create(&self, entity: &mut T) -> Result<VersionToken, RepositoryError> {
        let partition_key = self.partition_key_for(entity);
        let id = entity.id();
        let body = to_document(&*entity)?;

        match self
            .call(self.store.create_item(&partition_key, &id.key(), body))
            .await?
        {
            Ok(response) => {
                debug!(partition_key = %partition_key, "document created");
                entity.audit_mut().etag = Some(response.etag.clone());
                Ok(response.etag)
            }
            Err(e) if e.is_conflict() => Err(RepositoryError::AlreadyExists {
                kind: T::KIND,
                id: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Inserts all entities as one atomic batch
    ///
    /// Every entity must resolve to the same partition key. An empty slice
    /// succeeds without contacting the store.
    #[instrument(skip(self, entities), fields(kind = T::KIND, count = entities.len()))]
    pub async fn create_many(&self, entities: &mut [T]) -> Result<(), RepositoryError> {
        let Some(partition_key) = batch::resolve_partition(
            entities,
            &self.partition_key,
            self.config.max_batch_operations,
        )?
        else {
            return Ok(());
        };

        let now = self.clock.now();
        let actor = self.actor.current_actor();
        let previous = snapshot(entities);
        for entity in entities.iter_mut() {
            entity.audit_mut().stamp_created(now, actor);
        }

        let result = self.submit_batch(entities, |members| {
            batch::create_request(partition_key, members)
        })
        .await;
        if result.is_err() {
            restore(entities, previous);
        }
        result
    }

    // ========================================================================
    // Read
    // ========================================================================

    /// Finds the non-deleted entity with `id`
    ///
    /// Runs as a cross-partition query so it works whatever the partition
    /// strategy. Absence is `Ok(None)`, not an error.
    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn get(&self, id: EntityId) -> Result<Option<T>, RepositoryError> {
        let mut request = self.query_request(
            Field::new(ID_FIELD).eq(id.key()).and(Self::visible()),
            None,
        );

        loop {
            let page = self.fetch_page(&request).await?;
            if let Some(document) = page.documents.into_iter().next() {
                return from_document(document).map(Some);
            }
            match page.continuation {
                Some(token) => request.continuation = Some(token),
                None => return Ok(None),
            }
        }
    }

    /// Point read when the caller already knows the partition
    #[instrument(skip(self), fields(kind = T::KIND, partition_key = %partition_key))]
    pub async fn get_in_partition(
        &self,
        id: EntityId,
        partition_key: &PartitionKey,
    ) -> Result<Option<T>, RepositoryError> {
        let document = self
            .call(self.store.read_item(partition_key, &id.key()))
            .await??;

        match document {
            Some(document) if Self::visible().matches(&document.body) => {
                from_document(document).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Returns every non-deleted entity, optionally narrowed by `filter`
    ///
    /// The soft-delete condition is always added to the caller's filter.
    /// Each call re-runs the full query, paging until exhausted.
    #[instrument(skip(self, filter), fields(kind = T::KIND))]
    pub async fn get_all(&self, filter: Option<Filter>) -> Result<Vec<T>, RepositoryError> {
        let visible = match filter {
            Some(filter) => Self::visible().and(filter),
            None => Self::visible(),
        };
        self.collect(self.query_request(visible, None)).await
    }

    /// Like [`get_all`](Self::get_all) but scoped to one partition
    #[instrument(skip(self, filter), fields(kind = T::KIND, partition_key = %partition_key))]
    pub async fn get_all_in_partition(
        &self,
        partition_key: &PartitionKey,
        filter: Option<Filter>,
    ) -> Result<Vec<T>, RepositoryError> {
        let visible = match filter {
            Some(filter) => Self::visible().and(filter),
            None => Self::visible(),
        };
        self.collect(self.query_request(visible, Some(partition_key.clone())))
            .await
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Replaces the stored document if its version token still matches
    ///
    /// A mismatch is reported as `RepositoryError::ConcurrencyConflict`;
    /// the caller must re-read before trying again.
    pub async fn update(&self, entity: &mut T) -> Result<VersionToken, RepositoryError> {
        let id = entity.id();
        self.try_update(entity).await?.into_result(T::KIND, id)
    }

    /// Same write as [`update`](Self::update), with conflict and not-found as values
    #[instrument(skip(self, entity), fields(kind = T::KIND, id = %entity.id()))]
    pub async fn try_update(&self, entity: &mut T) -> Result<UpdateOutcome, RepositoryError> {
        self.guarded_replace(entity, false).await
    }

    /// Replaces all entities as one atomic batch of conditional replaces
    #[instrument(skip(self, entities), fields(kind = T::KIND, count = entities.len()))]
    pub async fn update_many(&self, entities: &mut [T]) -> Result<(), RepositoryError> {
        let Some(partition_key) = batch::resolve_partition(
            entities,
            &self.partition_key,
            self.config.max_batch_operations,
        )?
        else {
            return Ok(());
        };
        let tokens = batch::require_tokens(entities)?;
        let stored = self.stored_audits(&partition_key, entities).await?;

        for (entity, token) in entities.iter().zip(&tokens) {
            if let Some((current, audit)) = stored.get(&entity.id().key()) {
                if current == token && audit.is_deleted() {
                    return Err(RepositoryError::not_found(T::KIND, entity.id()));
                }
            }
        }

        let now = self.clock.now();
        let actor = self.actor.current_actor();
        let previous = snapshot(entities);
        for entity in entities.iter_mut() {
            if let Some((_, audit)) = stored.get(&entity.id().key()) {
                entity.audit_mut().carry_stored(audit);
            }
            entity.audit_mut().stamp_updated(now, actor);
        }

        let result = self.submit_batch(entities, |members| {
            batch::replace_request(partition_key, members, tokens)
        })
        .await;
        if result.is_err() {
            restore(entities, previous);
        }
        result
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Physically removes the document
    ///
    /// Removing a document that is already gone yields `NotFound`.
    #[instrument(skip(self, entity), fields(kind = T::KIND, id = %entity.id()))]
    pub async fn delete(&self, entity: &T) -> Result<(), RepositoryError> {
        let partition_key = self.partition_key_for(entity);
        let id = entity.id();

        match self
            .call(self.store.delete_item(&partition_key, &id.key(), None))
            .await?
        {
            Ok(()) => {
                debug!(partition_key = %partition_key, "document removed");
                Ok(())
            }
            Err(e) if e.is_not_found() => Err(RepositoryError::not_found(T::KIND, id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Marks the document deleted without removing it
    ///
    /// Stamps `isDeleted`, `deletedAt` and `deletedBy` and writes through the
    /// same version-token check as [`update`](Self::update). The entity is
    /// hidden from every read afterwards.
    #[instrument(skip(self, entity), fields(kind = T::KIND, id = %entity.id()))]
    pub async fn soft_delete(&self, entity: &mut T) -> Result<VersionToken, RepositoryError> {
        let id = entity.id();
        if entity.is_deleted() {
            return Err(RepositoryError::not_found(T::KIND, id));
        }
        self.guarded_replace(entity, true)
            .await?
            .into_result(T::KIND, id)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn require_token(&self, entity: &T) -> Result<VersionToken, RepositoryError> {
        entity
            .version_token()
            .cloned()
            .ok_or_else(|| RepositoryError::MissingVersionToken {
                kind: T::KIND,
                id: entity.id().to_string(),
            })
    }

    /// Documents of this kind that are not soft-deleted
    fn visible() -> Filter {
        Filter::not_deleted().and(Field::new(KIND_FIELD).eq(T::KIND))
    }

    /// Conditional replace that re-derives the audit block from the store
    ///
    /// The creation and deletion record always comes from the stored
    /// document, never from the caller's copy. The entity is left as it
    /// was unless the write lands.
    async fn guarded_replace(
        &self,
        entity: &mut T,
        deleting: bool,
    ) -> Result<UpdateOutcome, RepositoryError> {
        if entity.is_deleted() {
            return Ok(UpdateOutcome::NotFound);
        }
        let token = self.require_token(entity)?;
        let partition_key = self.partition_key_for(entity);

        let previous = entity.audit().clone();
        let outcome = self
            .stamp_and_replace(entity, &partition_key, token, deleting)
            .await;
        if !matches!(outcome, Ok(UpdateOutcome::Updated(_))) {
            *entity.audit_mut() = previous;
        }
        outcome
    }

    async fn stamp_and_replace(
        &self,
        entity: &mut T,
        partition_key: &PartitionKey,
        token: VersionToken,
        deleting: bool,
    ) -> Result<UpdateOutcome, RepositoryError> {
        let stored = match self
            .call(self.store.read_item(partition_key, &entity.id().key()))
            .await??
        {
            Some(document) if Field::new(KIND_FIELD).eq(T::KIND).matches(&document.body) => {
                document
            }
            _ => return Ok(UpdateOutcome::NotFound),
        };
        if stored.etag != token {
            warn!(stale_token = %token, "version token no longer current");
            return Ok(UpdateOutcome::Conflict);
        }
        let stored_audit: AuditFields = serde_json::from_value(stored.body)?;
        if stored_audit.is_deleted() {
            return Ok(UpdateOutcome::NotFound);
        }

        let now = self.clock.now();
        let actor = self.actor.current_actor();
        let audit = entity.audit_mut();
        audit.carry_stored(&stored_audit);
        if deleting {
            audit.stamp_deleted(now, actor);
        } else {
            audit.stamp_updated(now, actor);
        }

        self.replace_if_match(entity, partition_key, token).await
    }

    async fn replace_if_match(
        &self,
        entity: &mut T,
        partition_key: &PartitionKey,
        token: VersionToken,
    ) -> Result<UpdateOutcome, RepositoryError> {
        let body = to_document(&*entity)?;

        match self
            .call(self.store.replace_item(
                partition_key,
                &entity.id().key(),
                body,
                Some(&token),
            ))
            .await?
        {
            Ok(response) => {
                entity.audit_mut().etag = Some(response.etag.clone());
                Ok(UpdateOutcome::Updated(response.etag))
            }
            Err(e) if e.is_precondition_failed() => {
                warn!(stale_token = %token, "version token rejected by store");
                Ok(UpdateOutcome::Conflict)
            }
            Err(e) if e.is_not_found() => Ok(UpdateOutcome::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Current token and audit block of each stored batch member, by document id
    async fn stored_audits(
        &self,
        partition_key: &PartitionKey,
        entities: &[T],
    ) -> Result<HashMap<String, (VersionToken, AuditFields)>, RepositoryError> {
        let ids: HashMap<String, EntityId> =
            entities.iter().map(|e| (e.id().key(), e.id())).collect();
        let mut request = self.query_request(
            Field::new(ID_FIELD).is_in(ids.keys().cloned()),
            Some(partition_key.clone()),
        );
        let own_kind = Field::new(KIND_FIELD).eq(T::KIND);

        let mut stored = HashMap::new();
        loop {
            let page = self.fetch_page(&request).await?;
            for document in page.documents {
                if !own_kind.matches(&document.body) {
                    match ids.get(&document.id) {
                        Some(id) => return Err(RepositoryError::not_found(T::KIND, *id)),
                        None => continue,
                    }
                }
                let audit: AuditFields = serde_json::from_value(document.body)?;
                stored.insert(document.id, (document.etag, audit));
            }
            match page.continuation {
                Some(token) => request.continuation = Some(token),
                None => return Ok(stored),
            }
        }
    }

    async fn submit_batch<F>(&self, entities: &mut [T], build: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&[T]) -> Result<BatchRequest, RepositoryError>,
    {
        let request = build(&*entities)?;
        let partition_key = request.partition_key.clone();

        let response = self.call(self.store.execute_batch(request)).await??;
        if !response.is_success() {
            warn!(
                partition_key = %partition_key,
                status = %response.status,
                failed_index = ?response.failed_index(),
                "batch rejected"
            );
        }
        batch::apply_response(entities, response)?;
        debug!(partition_key = %partition_key, "batch committed");
        Ok(())
    }

    fn query_request(&self, filter: Filter, partition_key: Option<PartitionKey>) -> QueryRequest {
        QueryRequest {
            filter,
            partition_key,
            continuation: None,
            max_item_count: self.config.query_page_size,
        }
    }

    async fn fetch_page(
        &self,
        request: &QueryRequest,
    ) -> Result<FeedPage, RepositoryError> {
        Ok(self.call(self.store.query(request)).await??)
    }

    async fn collect(&self, mut request: QueryRequest) -> Result<Vec<T>, RepositoryError> {
        let mut results = Vec::new();
        loop {
            let page = self.fetch_page(&request).await?;
            for document in page.documents {
                results.push(from_document(document)?);
            }
            match page.continuation {
                Some(token) => request.continuation = Some(token),
                None => break,
            }
        }
        debug!(count = results.len(), "query drained");
        Ok(results)
    }

    /// Runs one store call under the bound cancellation token and timeout
    ///
    /// The outer `Result` carries repository-level failures (cancelled,
    /// timed out); the inner one is the store's own answer, left for the
    /// caller to interpret in context.
    async fn call<R, F>(&self, operation: F) -> Result<Result<R, StoreError>, RepositoryError>
    where
        F: Future<Output = Result<R, StoreError>> + Send,
    {
        let bounded = async {
            match self.config.timeout() {
                Some(limit) => tokio::time::timeout(limit, operation).await.map_err(|_| {
                    RepositoryError::Timeout {
                        after_ms: limit.as_millis() as u64,
                    }
                }),
                None => Ok(operation.await),
            }
        };

        match &self.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    warn!("store call abandoned by cancellation");
                    Err(RepositoryError::Cancelled)
                }
                result = bounded => result,
            },
            None => bounded.await,
        }
    }
}

fn from_document<T: Entity>(document: StoredDocument) -> Result<T, RepositoryError> {
    let mut entity: T = serde_json::from_value(document.body)?;
    entity.audit_mut().etag = Some(document.etag);
    Ok(entity)
}

fn snapshot<T: Entity>(entities: &[T]) -> Vec<AuditFields> {
    entities.iter().map(|e| e.audit().clone()).collect()
}

fn restore<T: Entity>(entities: &mut [T], previous: Vec<AuditFields>) {
    for (entity, audit) in entities.iter_mut().zip(previous) {
        *entity.audit_mut() = audit;
    }
}
