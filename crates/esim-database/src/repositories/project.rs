//! Project repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use esim_core::result::AppResult;
use esim_entity::project::Project;

use super::{ProjectRepository, map_db_error};

/// PostgreSQL-backed [`ProjectRepository`].
#[derive(Debug, Clone)]
pub struct PgProjectRepository {
    pool: PgPool,
}

impl PgProjectRepository {
    /// Create a new project repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn find_by_id(&self, project_id: Uuid) -> AppResult<Option<Project>> {
        sqlx::query_as::<_, Project>(
            "SELECT project_id, title, state_id, author_id, created_at \
             FROM projects WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to find project", e))
    }
}
