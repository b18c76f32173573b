//! Role permission entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Grants members of `role_id` the right to delete their own saves whose
/// linked project is in workflow state `del_own_states`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RolePermission {
    /// Unique permission row identifier.
    pub id: Uuid,
    /// The role receiving the grant.
    pub role_id: Uuid,
    /// Workflow state in which own saves may be deleted.
    pub del_own_states: Uuid,
}
