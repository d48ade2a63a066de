//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating sample entities and
//! query inputs.

use core_kernel::EntityId;
use domain_repository::AuditFields;
use proptest::prelude::*;
use uuid::Uuid;

use crate::fixtures::{Order, OrderStatus};

/// Strategy for generating entity ids
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    any::<u128>().prop_map(|n| EntityId::from_uuid(Uuid::from_u128(n)))
}

/// Strategy for generating order statuses
pub fn order_status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Open),
        Just(OrderStatus::Shipped),
        Just(OrderStatus::Cancelled),
    ]
}

/// Strategy for generating tenant names from a small pool
///
/// A small pool makes collisions (shared partitions) likely.
pub fn tenant_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("tenant-acme".to_string()),
        Just("tenant-globex".to_string()),
        Just("tenant-initech".to_string()),
    ]
}

/// Strategy for generating order totals in cents
pub fn total_cents_strategy() -> impl Strategy<Value = i64> {
    0i64..10_000_000i64
}

/// Strategy for generating unsaved orders
pub fn order_strategy() -> impl Strategy<Value = Order> {
    (
        entity_id_strategy(),
        tenant_strategy(),
        "[A-Z][a-z]{2,10} [A-Z][a-z]{2,12}",
        order_status_strategy(),
        total_cents_strategy(),
    )
        .prop_map(|(id, tenant, customer, status, total_cents)| Order {
            id,
            tenant,
            customer,
            status,
            total_cents,
            audit: AuditFields::default(),
        })
}

/// Strategy for generating orders that all share one tenant
pub fn same_tenant_orders_strategy(max: usize) -> impl Strategy<Value = Vec<Order>> {
    (tenant_strategy(), prop::collection::vec(order_strategy(), 1..=max)).prop_map(
        |(tenant, mut orders)| {
            for order in &mut orders {
                order.tenant = tenant.clone();
            }
            orders
        },
    )
}
