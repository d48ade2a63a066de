//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! document repository test suite.
//!
//! # Modules
//!
//! - `fixtures`: Sample entity types and predictable test data
//! - `builders`: Builder patterns for test data construction
//! - `clock`: A manually advanced clock for audit timestamp assertions
//! - `store`: Store wrappers that record traffic to the document store
//! - `assertions`: Custom assertion helpers for repository results
//! - `generators`: Property-based test data generators
//! - `telemetry`: One-time tracing subscriber setup for tests

pub mod fixtures;
pub mod builders;
pub mod clock;
pub mod store;
pub mod assertions;
pub mod generators;
pub mod telemetry;

pub use fixtures::*;
pub use builders::*;
pub use clock::*;
pub use store::*;
pub use assertions::*;
pub use generators::*;
pub use telemetry::init_test_tracing;
