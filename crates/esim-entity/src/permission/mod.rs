//! Workflow permission entities.

pub mod model;

pub use model::RolePermission;
