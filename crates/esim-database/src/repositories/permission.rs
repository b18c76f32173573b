//! Role permission repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use esim_core::result::AppResult;

use super::{PermissionRepository, map_db_error};

/// PostgreSQL-backed [`PermissionRepository`].
#[derive(Debug, Clone)]
pub struct PgPermissionRepository {
    pool: PgPool,
}

impl PgPermissionRepository {
    /// Create a new permission repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for PgPermissionRepository {
    async fn can_delete_own_in_state(&self, user_id: Uuid, state_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
                 SELECT 1 FROM user_roles ur \
                 JOIN role_permissions rp ON rp.role_id = ur.role_id \
                 WHERE ur.user_id = $1 AND rp.del_own_states = $2 \
             )",
        )
        .bind(user_id)
        .bind(state_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to check delete permission", e))
    }
}
