//! Tests for single-document repository operations

use chrono::Duration;

use domain_repository::{
    AuditFields, Field, PartitionKey, RepositoryConfig, RepositoryError, StoreError, StoreStatus,
    UpdateOutcome,
};
use test_utils::{
    assert_conflict, assert_created_by, assert_not_found, assert_soft_deleted, assert_updated_by,
    init_test_tracing, line_items_for, AuditFixtures, IdFixtures, LineItem, OrderStatus,
    StringFixtures, TemporalFixtures, TestHarness, TestOrderBuilder,
};

fn tenant_key() -> PartitionKey {
    PartitionKey::new(StringFixtures::tenant())
}

// ============= CREATE TESTS =============
mod create_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_stamps_audit_and_token() {
        init_test_tracing();
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();

        let token = orders.create(&mut order).await.unwrap();

        assert_eq!(order.audit.etag(), Some(&token));
        assert_created_by(&order, TemporalFixtures::reference_instant(), harness.actor);
    }

    #[tokio::test]
    async fn test_create_overwrites_caller_audit_values() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new()
            .with_audit(AuditFixtures::forged(true, None))
            .build();

        orders.create(&mut order).await.unwrap();

        assert_created_by(&order, TemporalFixtures::reference_instant(), harness.actor);
        let stored = orders.get(order.id).await.unwrap().expect("visible after create");
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn test_create_duplicate_is_already_exists_and_leaves_entity_untouched() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut original = TestOrderBuilder::new().build();
        orders.create(&mut original).await.unwrap();

        let mut duplicate = TestOrderBuilder::new().with_id(original.id).build();
        let result = orders.create(&mut duplicate).await;

        assert!(matches!(result, Err(RepositoryError::AlreadyExists { kind: "Order", .. })));
        assert_eq!(duplicate.audit, AuditFields::default());
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced_with_status() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        harness
            .store
            .inject_failure(StoreError::new(StoreStatus::TooManyRequests, "throttled"));

        let mut order = TestOrderBuilder::new().build();
        let error = orders.create(&mut order).await.unwrap_err();

        match &error {
            RepositoryError::Store(e) => assert_eq!(e.status, StoreStatus::TooManyRequests),
            other => panic!("Expected Store error, got {:?}", other),
        }
        assert!(error.is_transient());
        assert!(order.audit.etag().is_none());
    }
}

// ============= READ TESTS =============
mod read_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_returns_stored_entity_with_token() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().with_total_cents(4_200).build();
        orders.create(&mut order).await.unwrap();

        let loaded = orders.get(order.id).await.unwrap().unwrap();

        assert_eq!(loaded.total_cents, 4_200);
        assert_eq!(loaded.audit.etag(), order.audit.etag());
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_none() {
        let harness = TestHarness::new();
        let orders = harness.orders();

        assert!(orders.get(IdFixtures::order_id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_in_partition() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();

        let hit = orders.get_in_partition(order.id, &tenant_key()).await.unwrap();
        let miss = orders
            .get_in_partition(order.id, &PartitionKey::new(StringFixtures::other_tenant()))
            .await
            .unwrap();

        assert_eq!(hit.map(|o| o.id), Some(order.id));
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_get_all_applies_caller_filter() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut open = TestOrderBuilder::new().build();
        let mut shipped = TestOrderBuilder::new().with_status(OrderStatus::Shipped).build();
        orders.create(&mut open).await.unwrap();
        orders.create(&mut shipped).await.unwrap();

        let result = orders
            .get_all(Some(Field::new("status").eq("shipped")))
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, shipped.id);
    }

    #[tokio::test]
    async fn test_get_all_hides_deleted_even_when_filter_selects_them() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();
        orders.soft_delete(&mut order).await.unwrap();

        let result = orders
            .get_all(Some(Field::new("isDeleted").eq(true)))
            .await
            .unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_get_all_drains_every_page() {
        let harness = TestHarness::new();
        let orders = harness.orders_with_config(RepositoryConfig::new().query_page_size(2));
        for _ in 0..5 {
            orders.create(&mut TestOrderBuilder::new().build()).await.unwrap();
        }

        let all = orders.get_all(None).await.unwrap();

        assert_eq!(all.len(), 5);
        assert!(harness.store.request_count() >= 5 + 3);
    }

    #[tokio::test]
    async fn test_get_all_in_partition_scopes_results() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        orders.create(&mut TestOrderBuilder::new().build()).await.unwrap();
        orders
            .create(&mut TestOrderBuilder::new().with_tenant(StringFixtures::other_tenant()).build())
            .await
            .unwrap();

        let scoped = orders.get_all_in_partition(&tenant_key(), None).await.unwrap();

        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].tenant, StringFixtures::tenant());
    }

    #[tokio::test]
    async fn test_kinds_sharing_a_store_stay_apart() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let items = harness.line_items();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();
        for mut item in line_items_for(order.id, 2) {
            items.create(&mut item).await.unwrap();
        }

        assert_eq!(orders.get_all(None).await.unwrap().len(), 1);
        assert_eq!(items.get_all(None).await.unwrap().len(), 2);
        assert!(items.get(order.id).await.unwrap().is_none());
        let order_partition = PartitionKey::from(order.id);
        assert_eq!(items.get_all_in_partition(&order_partition, None).await.unwrap().len(), 2);
        assert_eq!(orders.get_all_in_partition(&order_partition, None).await.unwrap().len(), 0);

        let raw = harness.store.raw_document(&tenant_key(), &order.id.key()).unwrap();
        assert_eq!(raw.body["entityKind"], "Order");
    }

    #[tokio::test]
    async fn test_write_of_other_kind_id_is_not_found() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let items = harness.line_items();
        let mut order = TestOrderBuilder::new().with_tenant("shared").build();
        orders.create(&mut order).await.unwrap();

        let mut impostor = LineItem::new(order.id, StringFixtures::sku(), 1);
        impostor.id = order.id;
        impostor.audit = order.audit.clone();
        let items = items.with_partition_key(|_: &LineItem| PartitionKey::new("shared"));

        assert_eq!(items.try_update(&mut impostor).await.unwrap(), UpdateOutcome::NotFound);
        assert_eq!(orders.get(order.id).await.unwrap(), Some(order));
    }
}

// ============= UPDATE TESTS =============
mod update_tests {
    use super::*;

    #[tokio::test]
    async fn test_update_restamps_and_rotates_token() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        let first = orders.create(&mut order).await.unwrap();

        harness.clock.set(TemporalFixtures::later_instant());
        order.status = OrderStatus::Shipped;
        let second = orders.update(&mut order).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(order.audit.created_at(), TemporalFixtures::reference_instant());
        assert_updated_by(&order, TemporalFixtures::later_instant(), harness.actor);
        let loaded = orders.get(order.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_stale_update_is_conflict_and_store_keeps_winner() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();

        let mut first = orders.get(order.id).await.unwrap().unwrap();
        let mut second = first.clone();

        first.total_cents = 100;
        orders.update(&mut first).await.unwrap();

        harness.clock.advance(Duration::hours(1));
        second.total_cents = 200;
        let before = second.audit.clone();
        assert_conflict(orders.update(&mut second).await);

        assert_eq!(second.audit, before);
        let stored = orders.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.total_cents, 100);
    }

    #[tokio::test]
    async fn test_try_update_reports_conflict_as_value() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();
        let mut stale = order.clone();
        orders.update(&mut order).await.unwrap();

        let outcome = orders.try_update(&mut stale).await.unwrap();

        assert_eq!(outcome, UpdateOutcome::Conflict);
        assert!(!outcome.is_updated());
    }

    #[tokio::test]
    async fn test_update_keeps_stored_creation_record() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();
        let original = orders.get(order.id).await.unwrap().unwrap();

        let mut tampered = original.clone();
        tampered.audit = AuditFixtures::forged(false, original.audit.etag());
        tampered.total_cents = 7;
        harness.clock.set(TemporalFixtures::later_instant());
        orders.update(&mut tampered).await.unwrap();

        let stored = orders.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.total_cents, 7);
        assert_eq!(stored.audit.created_at(), original.audit.created_at());
        assert_eq!(stored.audit.created_by(), original.audit.created_by());
        assert!(stored.audit.deleted_at().is_none());
        assert!(stored.audit.deleted_by().is_none());
        assert_updated_by(&stored, TemporalFixtures::later_instant(), harness.actor);
        assert_eq!(tampered, stored);
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_stored_creation_record() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();

        let mut tampered = order.clone();
        tampered.audit = AuditFixtures::forged(false, order.audit.etag());
        harness.clock.set(TemporalFixtures::later_instant());
        orders.soft_delete(&mut tampered).await.unwrap();

        assert_eq!(tampered.audit.created_at(), TemporalFixtures::reference_instant());
        assert_eq!(tampered.audit.created_by(), Some(harness.actor));
        assert_soft_deleted(&tampered, TemporalFixtures::later_instant(), harness.actor);
    }

    #[tokio::test]
    async fn test_update_without_token_is_rejected() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut never_read = TestOrderBuilder::new().build();

        let result = orders.update(&mut never_read).await;

        assert!(matches!(result, Err(RepositoryError::MissingVersionToken { .. })));
        assert_eq!(harness.store.request_count(), 0);
    }

    #[tokio::test]
    async fn test_update_of_removed_document_is_not_found() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();
        orders.delete(&order).await.unwrap();

        assert_not_found(orders.update(&mut order).await);
    }
}

// ============= DELETE TESTS =============
mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_soft_delete_hides_but_keeps_document() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();

        harness.clock.set(TemporalFixtures::later_instant());
        orders.soft_delete(&mut order).await.unwrap();

        assert_soft_deleted(&order, TemporalFixtures::later_instant(), harness.actor);
        assert!(orders.get(order.id).await.unwrap().is_none());
        assert!(orders.get_in_partition(order.id, &tenant_key()).await.unwrap().is_none());
        assert!(orders.get_all(None).await.unwrap().is_empty());

        let raw = harness
            .store
            .raw_document(&tenant_key(), &order.id.key())
            .expect("document retained");
        assert_eq!(raw.body["isDeleted"], true);
        assert_eq!(raw.body["deletedBy"], serde_json::json!(harness.actor));
    }

    #[tokio::test]
    async fn test_soft_deleted_entity_rejects_further_writes() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();
        orders.soft_delete(&mut order).await.unwrap();

        assert_not_found(orders.soft_delete(&mut order).await);
        assert_eq!(orders.try_update(&mut order).await.unwrap(), UpdateOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_soft_delete_with_stale_token_is_conflict() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();
        let mut stale = order.clone();
        orders.update(&mut order).await.unwrap();

        assert_conflict(orders.soft_delete(&mut stale).await);
        assert!(!stale.audit.is_deleted());
        assert!(orders.get(order.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();

        orders.delete(&order).await.unwrap();

        assert!(harness.store.raw_document(&tenant_key(), &order.id.key()).is_none());
        assert_eq!(harness.store.document_count(), 0);
        assert_not_found(orders.delete(&order).await);
    }

    #[tokio::test]
    async fn test_delete_also_removes_soft_deleted_document() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();
        orders.soft_delete(&mut order).await.unwrap();

        orders.delete(&order).await.unwrap();

        assert_eq!(harness.store.document_count(), 0);
    }
}

// ============= SCENARIO TESTS =============
mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_order_lifecycle() -> anyhow::Result<()> {
        init_test_tracing();
        let harness = TestHarness::new();
        let orders = harness.orders();

        let mut order = TestOrderBuilder::new().with_total_cents(9_900).build();
        orders.create(&mut order).await?;

        let mut loaded = orders
            .get(order.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("order {} not visible", order.id))?;
        harness.clock.advance(Duration::minutes(30));
        loaded.status = OrderStatus::Shipped;
        orders.update(&mut loaded).await?;

        let shipped = orders
            .get_all(Some(Field::new("status").eq("shipped")))
            .await?;
        assert_eq!(shipped.len(), 1);

        orders.soft_delete(&mut loaded).await?;
        assert!(orders.get_all(None).await?.is_empty());
        assert_eq!(harness.store.document_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_token_permits_exactly_one_update() {
        let harness = TestHarness::new();
        let orders = harness.orders();
        let mut order = TestOrderBuilder::new().build();
        orders.create(&mut order).await.unwrap();

        let mut t1 = orders.get(order.id).await.unwrap().unwrap();
        let mut t1_again = t1.clone();
        t1.total_cents = 1;
        orders.update(&mut t1).await.unwrap();

        t1_again.total_cents = 2;
        assert_conflict(orders.update(&mut t1_again).await);

        orders.delete(&t1).await.unwrap();
        assert!(orders.get(order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_health_check_delegates_to_store() {
        let harness = TestHarness::new();
        let result = harness.orders().health_check().await;

        assert!(result.status.is_operational());
    }
}
