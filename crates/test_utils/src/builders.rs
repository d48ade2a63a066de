//! Test Data Builders
//!
//! Provides builder patterns for constructing test entities with sensible
//! defaults. Tests specify only the relevant fields.

use std::sync::Arc;

use core_kernel::{ActorId, Clock, EntityId, StaticActor};
use domain_repository::{
    AuditFields, DocumentStore, InMemoryDocumentStore, Repository, RepositoryConfig,
};

use crate::clock::ManualClock;
use crate::fixtures::{IdFixtures, LineItem, Order, OrderStatus, StringFixtures, TemporalFixtures};

/// Builder for constructing test orders
pub struct TestOrderBuilder {
    id: EntityId,
    tenant: String,
    customer: String,
    status: OrderStatus,
    total_cents: i64,
    audit: AuditFields,
}

impl Default for TestOrderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestOrderBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            id: EntityId::new(),
            tenant: StringFixtures::tenant().to_string(),
            customer: StringFixtures::customer().to_string(),
            status: OrderStatus::Open,
            total_cents: 12_500,
            audit: AuditFields::default(),
        }
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = customer.into();
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_total_cents(mut self, total_cents: i64) -> Self {
        self.total_cents = total_cents;
        self
    }

    /// Pre-fills audit fields, e.g. to prove the repository overwrites them
    pub fn with_audit(mut self, audit: AuditFields) -> Self {
        self.audit = audit;
        self
    }

    pub fn build(self) -> Order {
        Order {
            id: self.id,
            tenant: self.tenant,
            customer: self.customer,
            status: self.status,
            total_cents: self.total_cents,
            audit: self.audit,
        }
    }

    /// Builds `count` orders that share this builder's tenant
    pub fn build_many(self, count: usize) -> Vec<Order> {
        (0..count)
            .map(|i| Order {
                id: EntityId::new(),
                tenant: self.tenant.clone(),
                customer: format!("{} #{}", self.customer, i + 1),
                status: self.status,
                total_cents: self.total_cents + i as i64,
                audit: self.audit.clone(),
            })
            .collect()
    }
}

/// Builds `count` line items of one order
pub fn line_items_for(order_id: EntityId, count: usize) -> Vec<LineItem> {
    (0..count)
        .map(|i| LineItem::new(order_id, format!("{}-{}", StringFixtures::sku(), i), 1 + i as u32))
        .collect()
}

/// Everything a repository test needs, wired against an in-memory store
pub struct TestHarness {
    pub store: Arc<InMemoryDocumentStore>,
    pub clock: Arc<ManualClock>,
    pub actor: ActorId,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_store(InMemoryDocumentStore::new())
    }

    pub fn with_store(store: InMemoryDocumentStore) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(ManualClock::new(TemporalFixtures::reference_instant())),
            actor: IdFixtures::actor_id(),
        }
    }

    /// Order repository partitioned by tenant
    pub fn orders(&self) -> Repository<Order> {
        self.orders_over(self.store.clone())
    }

    /// Order repository over an arbitrary store, e.g. a wrapper around this harness's store
    pub fn orders_over(&self, store: Arc<dyn DocumentStore>) -> Repository<Order> {
        Repository::new(
            store,
            self.clock.clone() as Arc<dyn Clock>,
            Arc::new(StaticActor::new(self.actor)),
        )
        .with_partition_key(Order::tenant_key)
    }

    pub fn orders_with_config(&self, config: RepositoryConfig) -> Repository<Order> {
        self.orders().with_config(config)
    }

    /// Line item repository sharing the order store
    pub fn line_items(&self) -> Repository<LineItem> {
        Repository::new(
            self.store.clone(),
            self.clock.clone() as Arc<dyn Clock>,
            Arc::new(StaticActor::new(self.actor)),
        )
        .with_partition_key(LineItem::order_key)
    }
}
