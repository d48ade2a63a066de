//! Pre-built Test Fixtures
//!
//! Provides sample entity types and ready-to-use test data. The entities
//! model a small order book: `Order` documents live in a partition named
//! after their tenant, and `LineItem` documents share the partition of
//! the order they belong to.

use chrono::{DateTime, TimeZone, Utc};
use core_kernel::{ActorId, EntityId};
use domain_repository::{AuditFields, Entity, PartitionKey, VersionToken};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a sample order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Shipped,
    Cancelled,
}

/// Sample entity partitioned by tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: EntityId,
    pub tenant: String,
    pub customer: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl Order {
    pub fn new(tenant: impl Into<String>, customer: impl Into<String>, total_cents: i64) -> Self {
        Self {
            id: EntityId::new(),
            tenant: tenant.into(),
            customer: customer.into(),
            status: OrderStatus::Open,
            total_cents,
            audit: AuditFields::default(),
        }
    }

    /// Partition-key strategy that groups orders by tenant
    pub fn tenant_key(order: &Order) -> PartitionKey {
        PartitionKey::new(order.tenant.clone())
    }
}

impl Entity for Order {
    const KIND: &'static str = "Order";

    fn id(&self) -> EntityId {
        self.id
    }

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }
}

/// Sample entity that shares its parent order's partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: EntityId,
    pub order_id: EntityId,
    pub sku: String,
    pub quantity: u32,
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl LineItem {
    pub fn new(order_id: EntityId, sku: impl Into<String>, quantity: u32) -> Self {
        Self {
            id: EntityId::new(),
            order_id,
            sku: sku.into(),
            quantity,
            audit: AuditFields::default(),
        }
    }

    /// Partition-key strategy that co-locates items with their order
    pub fn order_key(item: &LineItem) -> PartitionKey {
        PartitionKey::from(item.order_id)
    }
}

impl Entity for LineItem {
    const KIND: &'static str = "LineItem";

    fn id(&self) -> EntityId {
        self.id
    }

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Instant used as "now" by fixed clocks (Jan 15, 2024, 09:30 UTC)
    pub fn reference_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
    }

    /// A later instant for update stamping
    pub fn later_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 16, 14, 0, 0).unwrap()
    }

    /// An instant far in the past, used to detect overwritten audit values
    pub fn bogus_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// Deterministic actor used as the acting principal
    pub fn actor_id() -> ActorId {
        ActorId::from_uuid(Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001))
    }

    /// A second deterministic actor
    pub fn other_actor_id() -> ActorId {
        ActorId::from_uuid(Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0002))
    }

    /// Deterministic order id
    pub fn order_id() -> EntityId {
        EntityId::from_uuid(Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_00a1))
    }
}

/// Fixture for audit blocks a caller should not be able to write
pub struct AuditFixtures;

impl AuditFixtures {
    /// Audit block claiming a bogus creation and, optionally, a deletion
    ///
    /// Built through serde, the same way a forged block would arrive from
    /// outside the process. The token is kept so a write is not rejected
    /// for lack of one.
    pub fn forged(is_deleted: bool, etag: Option<&VersionToken>) -> AuditFields {
        let mut fields = serde_json::json!({
            "createdAt": TemporalFixtures::bogus_instant(),
            "createdBy": IdFixtures::other_actor_id(),
            "updatedAt": TemporalFixtures::bogus_instant(),
            "updatedBy": IdFixtures::other_actor_id(),
            "isDeleted": is_deleted,
            "deletedAt": TemporalFixtures::bogus_instant(),
            "deletedBy": IdFixtures::other_actor_id(),
        });
        if let Some(etag) = etag {
            fields["_etag"] = serde_json::json!(etag);
        }
        serde_json::from_value(fields).expect("forged audit block deserializes")
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    pub fn tenant() -> &'static str {
        "tenant-acme"
    }

    pub fn other_tenant() -> &'static str {
        "tenant-globex"
    }

    pub fn customer() -> &'static str {
        "Jane Smith"
    }

    pub fn sku() -> &'static str {
        "SKU-1001"
    }
}
