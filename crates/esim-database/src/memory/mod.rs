//! In-memory repository implementations.
//!
//! Used by the `memory` database provider for local runs and by the test
//! suites. Applies the same uniqueness rules as the PostgreSQL schema.

pub mod store;

pub use store::MemoryStore;
