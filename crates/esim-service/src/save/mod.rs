//! Save record use cases.
//!
//! [`SaveService`] is split by concern: `service` holds create, fetch,
//! update, and delete; `copy`, `share`, and `search` extend it with the
//! remaining operations.

pub mod copy;
pub mod search;
pub mod service;
pub mod share;

pub use service::{CreateSaveInput, OwnedSave, SaveService, UpdateSaveInput};
