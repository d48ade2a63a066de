//! Partition keys and their derivation
//!
//! Every document lives in exactly one partition. Atomic batches are
//! scoped to one partition, so how a repository derives the key decides
//! which entities can ever be written together.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use core_kernel::EntityId;

use crate::entity::Entity;

/// The value that routes a document to its physical partition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartitionKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PartitionKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<EntityId> for PartitionKey {
    fn from(id: EntityId) -> Self {
        Self(id.key())
    }
}

/// Derives a partition key from an entity
///
/// Injected into a repository at construction; the default is [`by_id`].
pub type PartitionKeyStrategy<T> = Arc<dyn Fn(&T) -> PartitionKey + Send + Sync>;

/// Default derivation: each entity is alone in a partition named after its id
pub fn by_id<T: Entity>(entity: &T) -> PartitionKey {
    PartitionKey::from(entity.id())
}

pub(crate) fn default_strategy<T: Entity>() -> PartitionKeyStrategy<T> {
    Arc::new(by_id::<T>)
}
