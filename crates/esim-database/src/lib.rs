//! # esim-database
//!
//! Persistent store for the state save service: PostgreSQL connection
//! management, embedded migrations, the repository traits the service
//! layer depends on, and their PostgreSQL and in-memory implementations.

pub mod connection;
pub mod memory;
pub mod provider;
pub mod repositories;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use provider::Repositories;
