//! Batch coordination for bulk writes
//!
//! A bulk write is only atomic inside one partition, so before anything is
//! sent the coordinator checks that every entity resolves to the same
//! partition key and that the batch fits the configured operation limit.
//! Chunking larger inputs is left to the caller: separate chunks would
//! not be atomic with respect to each other.

use crate::entity::{to_document, Entity, VersionToken};
use crate::error::{RepositoryError, StoreError, StoreStatus};
use crate::partition::{PartitionKey, PartitionKeyStrategy};
use crate::store::{BatchRequest, BatchResponse};

/// Resolves the single partition key shared by `entities`
///
/// Returns `Ok(None)` for an empty slice.
pub(crate) fn resolve_partition<T: Entity>(
    entities: &[T],
    strategy: &PartitionKeyStrategy<T>,
    max_operations: usize,
) -> Result<Option<PartitionKey>, RepositoryError> {
    let Some((first, rest)) = entities.split_first() else {
        return Ok(None);
    };

    if entities.len() > max_operations {
        return Err(RepositoryError::BatchTooLarge {
            size: entities.len(),
            max: max_operations,
        });
    }

    let expected = strategy(first);
    for (offset, entity) in rest.iter().enumerate() {
        let found = strategy(entity);
        if found != expected {
            return Err(RepositoryError::MixedPartitions {
                expected,
                found,
                index: offset + 1,
            });
        }
    }

    Ok(Some(expected))
}

/// Collects the version token of every member, or names the first one missing
pub(crate) fn require_tokens<T: Entity>(entities: &[T]) -> Result<Vec<VersionToken>, RepositoryError> {
    entities
        .iter()
        .map(|entity| {
            if entity.is_deleted() {
                return Err(RepositoryError::not_found(T::KIND, entity.id()));
            }
            entity
                .version_token()
                .cloned()
                .ok_or_else(|| RepositoryError::MissingVersionToken {
                    kind: T::KIND,
                    id: entity.id().to_string(),
                })
        })
        .collect()
}

pub(crate) fn create_request<T: Entity>(
    partition_key: PartitionKey,
    entities: &[T],
) -> Result<BatchRequest, RepositoryError> {
    entities.iter().try_fold(BatchRequest::new(partition_key), |batch, entity| {
        Ok(batch.create(entity.id().key(), to_document(entity)?))
    })
}

pub(crate) fn replace_request<T: Entity>(
    partition_key: PartitionKey,
    entities: &[T],
    tokens: Vec<VersionToken>,
) -> Result<BatchRequest, RepositoryError> {
    entities
        .iter()
        .zip(tokens)
        .try_fold(BatchRequest::new(partition_key), |batch, (entity, token)| {
            Ok(batch.replace(entity.id().key(), to_document(entity)?, Some(token)))
        })
}

/// Copies per-operation tokens back onto the entities of a successful batch
///
/// A successful response must carry one token per entity; anything else is
/// reported as a bad store response and no entity is touched.
pub(crate) fn apply_response<T: Entity>(
    entities: &mut [T],
    response: BatchResponse,
) -> Result<(), RepositoryError> {
    if !response.is_success() {
        return Err(RepositoryError::Batch {
            status: response.status,
            failed_index: response.failed_index(),
        });
    }

    if response.results.len() != entities.len() {
        return Err(bad_response(format!(
            "batch returned {} results for {} operations",
            response.results.len(),
            entities.len()
        )));
    }
    let tokens = response
        .results
        .into_iter()
        .enumerate()
        .map(|(index, result)| {
            result
                .etag
                .ok_or_else(|| bad_response(format!("batch result {} carries no version token", index)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (entity, token) in entities.iter_mut().zip(tokens) {
        entity.audit_mut().etag = Some(token);
    }
    Ok(())
}

fn bad_response(message: String) -> RepositoryError {
    StoreError::new(StoreStatus::InternalServerError, message).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BatchOperation, BatchOperationResult};
    use crate::AuditFields;
    use core_kernel::EntityId;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        id: EntityId,
        #[serde(flatten)]
        audit: AuditFields,
    }

    impl Entity for Note {
        const KIND: &'static str = "Note";

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

    fn notes(count: usize) -> Vec<Note> {
        (0..count)
            .map(|_| Note {
                id: EntityId::new(),
                audit: AuditFields::default(),
            })
            .collect()
    }

    fn created(etag: Option<&str>) -> BatchOperationResult {
        BatchOperationResult {
            status: StoreStatus::Created,
            etag: etag.map(VersionToken::new),
        }
    }

    fn assert_bad_response(result: Result<(), RepositoryError>) {
        match result {
            Err(RepositoryError::Store(e)) => {
                assert_eq!(e.status, StoreStatus::InternalServerError)
            }
            other => panic!("Expected Store error, got {:?}", other),
        }
    }

    #[test]
    fn test_apply_response_sets_every_token() {
        let mut batch = notes(2);
        let response = BatchResponse {
            status: StoreStatus::Ok,
            results: vec![created(Some("a")), created(Some("b"))],
        };

        apply_response(&mut batch, response).unwrap();

        assert_eq!(batch[0].version_token(), Some(&VersionToken::new("a")));
        assert_eq!(batch[1].version_token(), Some(&VersionToken::new("b")));
    }

    #[test]
    fn test_short_response_is_rejected() {
        let mut batch = notes(3);
        let response = BatchResponse {
            status: StoreStatus::Ok,
            results: vec![created(Some("a")), created(Some("b"))],
        };

        assert_bad_response(apply_response(&mut batch, response));
        assert!(batch.iter().all(|n| n.version_token().is_none()));
    }

    #[test]
    fn test_result_without_token_is_rejected() {
        let mut batch = notes(2);
        let response = BatchResponse {
            status: StoreStatus::Ok,
            results: vec![created(Some("a")), created(None)],
        };

        assert_bad_response(apply_response(&mut batch, response));
        assert!(batch.iter().all(|n| n.version_token().is_none()));
    }

    #[test]
    fn test_documents_carry_kind() {
        let batch = notes(1);
        let request = create_request(PartitionKey::new("p"), &batch).unwrap();

        match &request.operations[..] {
            [BatchOperation::Create { body, .. }] => assert_eq!(body["entityKind"], "Note"),
            other => panic!("Expected one create, got {:?}", other),
        }
    }
}
