//! Acting principal resolution
//!
//! The identity written into `createdBy`, `updatedBy` and `deletedBy`.
//! `None` means an unauthenticated or system context.

use crate::identifiers::ActorId;

/// Supplies the identifier of the principal performing the current operation
pub trait ActorResolver: Send + Sync {
    fn current_actor(&self) -> Option<ActorId>;
}

/// Background/system context with no authenticated principal
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemActor;

impl ActorResolver for SystemActor {
    fn current_actor(&self) -> Option<ActorId> {
        None
    }
}

/// Always resolves to the same principal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticActor(ActorId);

impl StaticActor {
    pub fn new(actor: ActorId) -> Self {
        Self(actor)
    }

    pub fn actor(&self) -> ActorId {
        self.0
    }
}

impl ActorResolver for StaticActor {
    fn current_actor(&self) -> Option<ActorId> {
        Some(self.0)
    }
}

impl<A: ActorResolver + ?Sized> ActorResolver for std::sync::Arc<A> {
    fn current_actor(&self) -> Option<ActorId> {
        (**self).current_actor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_actor_is_anonymous() {
        assert_eq!(SystemActor.current_actor(), None);
    }

    #[test]
    fn test_static_actor() {
        let id = ActorId::new();
        assert_eq!(StaticActor::new(id).current_actor(), Some(id));
    }
}
