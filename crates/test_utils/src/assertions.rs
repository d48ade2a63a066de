//! Custom Test Assertions
//!
//! Provides assertion helpers for repository results that give more
//! meaningful failure messages than bare `assert!`.

use chrono::{DateTime, Utc};
use core_kernel::ActorId;
use domain_repository::{Entity, RepositoryError};

/// Asserts that an entity carries a fresh creation stamp
///
/// # Panics
///
/// Panics if any creation field differs or a deletion field is set
pub fn assert_created_by<T: Entity>(entity: &T, at: DateTime<Utc>, actor: ActorId) {
    let audit = entity.audit();
    assert_eq!(audit.created_at(), at, "createdAt mismatch for {}", entity.id());
    assert_eq!(audit.created_by(), Some(actor), "createdBy mismatch for {}", entity.id());
    assert_eq!(audit.updated_at(), Some(at), "updatedAt mismatch for {}", entity.id());
    assert_eq!(audit.updated_by(), Some(actor), "updatedBy mismatch for {}", entity.id());
    assert!(!audit.is_deleted(), "{} should not be deleted", entity.id());
    assert!(audit.deleted_at().is_none(), "deletedAt set on {}", entity.id());
    assert!(audit.deleted_by().is_none(), "deletedBy set on {}", entity.id());
    assert!(entity.version_token().is_some(), "{} has no version token", entity.id());
}

/// Asserts that an entity was last updated at `at` by `actor`
pub fn assert_updated_by<T: Entity>(entity: &T, at: DateTime<Utc>, actor: ActorId) {
    let audit = entity.audit();
    assert_eq!(audit.updated_at(), Some(at), "updatedAt mismatch for {}", entity.id());
    assert_eq!(audit.updated_by(), Some(actor), "updatedBy mismatch for {}", entity.id());
}

/// Asserts that an entity carries a complete soft-delete stamp
pub fn assert_soft_deleted<T: Entity>(entity: &T, at: DateTime<Utc>, actor: ActorId) {
    let audit = entity.audit();
    assert!(audit.is_deleted(), "{} should be marked deleted", entity.id());
    assert_eq!(audit.deleted_at(), Some(at), "deletedAt mismatch for {}", entity.id());
    assert_eq!(audit.deleted_by(), Some(actor), "deletedBy mismatch for {}", entity.id());
}

/// Asserts that a result is a concurrency conflict
///
/// # Panics
///
/// Panics on success or on any other error
pub fn assert_conflict<R: std::fmt::Debug>(result: Result<R, RepositoryError>) {
    match result {
        Err(e) if e.is_concurrency_conflict() => {}
        other => panic!("Expected concurrency conflict, got {:?}", other),
    }
}

/// Asserts that a result is a not-found error
pub fn assert_not_found<R: std::fmt::Debug>(result: Result<R, RepositoryError>) {
    match result {
        Err(e) if e.is_not_found() => {}
        other => panic!("Expected not found, got {:?}", other),
    }
}
