//! Core Kernel - Foundational types shared by the document repository layer
//!
//! This crate provides the building blocks every repository depends on:
//! - Strongly-typed identifiers for documents and acting principals
//! - The `Clock` and `ActorResolver` collaborators used for audit stamping
//! - Port marker traits and health reporting for store adapters

pub mod identifiers;
pub mod clock;
pub mod actor;
pub mod ports;
pub mod error;

pub use identifiers::{EntityId, ActorId};
pub use clock::{Clock, SystemClock, FixedClock};
pub use actor::{ActorResolver, SystemActor, StaticActor};
pub use ports::{DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
pub use error::CoreError;
