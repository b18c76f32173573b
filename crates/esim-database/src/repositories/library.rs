//! Component library repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use esim_core::result::AppResult;

use super::{LibraryRepository, map_db_error};

/// PostgreSQL-backed [`LibraryRepository`].
#[derive(Debug, Clone)]
pub struct PgLibraryRepository {
    pool: PgPool,
}

impl PgLibraryRepository {
    /// Create a new library repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LibraryRepository for PgLibraryRepository {
    async fn find_missing(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar::<_, Uuid>(
            "SELECT wanted FROM UNNEST($1::uuid[]) AS wanted \
             WHERE NOT EXISTS (SELECT 1 FROM esim_libraries l WHERE l.id = wanted)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to resolve libraries", e))
    }
}
