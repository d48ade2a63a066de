//! Entity capability contract and audit fields
//!
//! Concrete document types embed [`AuditFields`] with `#[serde(flatten)]`
//! and implement [`Entity`] to hand the repository access to their id
//! and audit block. Audit values are read-only outside this crate; the
//! repository is the only writer. Stored documents also carry an
//! `entityKind` field so several kinds can share one store.
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! pub struct Order {
//!     pub id: EntityId,
//!     pub customer: String,
//!     #[serde(flatten)]
//!     pub audit: AuditFields,
//! }
//!
//! impl Entity for Order {
//!     const KIND: &'static str = "Order";
//!     fn id(&self) -> EntityId { self.id }
//!     fn audit(&self) -> &AuditFields { &self.audit }
//!     fn audit_mut(&mut self) -> &mut AuditFields { &mut self.audit }
//! }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use core_kernel::{ActorId, EntityId};

use crate::error::RepositoryError;
use crate::query::KIND_FIELD;

/// Opaque token the store assigns on every write
///
/// Compared for equality only; its contents carry no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Audit block shared by every stored entity
///
/// Only the repository writes these fields; callers read them through the
/// getters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditFields {
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: Option<DateTime<Utc>>,
    pub(crate) is_deleted: bool,
    pub(crate) created_by: Option<ActorId>,
    pub(crate) updated_by: Option<ActorId>,
    pub(crate) deleted_by: Option<ActorId>,
    pub(crate) deleted_at: Option<DateTime<Utc>>,
    #[serde(rename = "_etag", skip_serializing_if = "Option::is_none")]
    pub(crate) etag: Option<VersionToken>,
}

impl AuditFields {
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn created_by(&self) -> Option<ActorId> {
        self.created_by
    }

    pub fn updated_by(&self) -> Option<ActorId> {
        self.updated_by
    }

    pub fn deleted_by(&self) -> Option<ActorId> {
        self.deleted_by
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Version token of the last read or write, if any
    pub fn etag(&self) -> Option<&VersionToken> {
        self.etag.as_ref()
    }

    /// Stamps a fresh document; any caller-supplied audit values are discarded
    pub(crate) fn stamp_created(&mut self, now: DateTime<Utc>, actor: Option<ActorId>) {
        *self = AuditFields {
            created_at: now,
            updated_at: Some(now),
            created_by: actor,
            updated_by: actor,
            ..AuditFields::default()
        };
    }

    /// Takes every field except the token from the stored copy
    ///
    /// Applied before a replace so the entity's own values cannot overwrite
    /// the creation or deletion record; `stamp_updated` runs afterwards.
    pub(crate) fn carry_stored(&mut self, stored: &AuditFields) {
        *self = AuditFields {
            etag: self.etag.take(),
            ..stored.clone()
        };
    }

    pub(crate) fn stamp_updated(&mut self, now: DateTime<Utc>, actor: Option<ActorId>) {
        self.updated_at = Some(now);
        self.updated_by = actor;
    }

    pub(crate) fn stamp_deleted(&mut self, now: DateTime<Utc>, actor: Option<ActorId>) {
        self.stamp_updated(now, actor);
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.deleted_by = actor;
    }
}

/// Capability a type needs to be managed by a `Repository`
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human-readable kind used in errors and log fields
    const KIND: &'static str;

    fn id(&self) -> EntityId;

    fn audit(&self) -> &AuditFields;

    fn audit_mut(&mut self) -> &mut AuditFields;

    fn version_token(&self) -> Option<&VersionToken> {
        self.audit().etag.as_ref()
    }

    fn is_deleted(&self) -> bool {
        self.audit().is_deleted
    }
}

/// Serializes an entity into its stored form, tagged with its kind
pub(crate) fn to_document<T: Entity>(entity: &T) -> Result<Value, RepositoryError> {
    let mut document = serde_json::to_value(entity)?;
    let fields = document.as_object_mut().ok_or_else(|| {
        RepositoryError::Serialization(format!("{} does not serialize to a JSON object", T::KIND))
    })?;
    fields.insert(KIND_FIELD.to_string(), Value::String(T::KIND.to_string()));
    Ok(document)
}
