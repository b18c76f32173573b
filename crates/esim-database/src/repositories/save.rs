//! State save repository implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;
use uuid::Uuid;

use esim_core::error::AppError;
use esim_core::result::AppResult;
use esim_core::types::pagination::{PageRequest, PageResponse};
use esim_entity::save::{NewStateSave, SaveFilter, StateSave, content_digest};

use super::{SaveRepository, UpsertOutcome, map_db_error};

/// Column list for every save read; library references are aggregated
/// into an array so each row maps straight onto [`StateSave`].
const SAVE_COLUMNS: &str = "s.id, s.save_id, s.version, s.branch, s.name, s.description, \
     s.data_dump, s.dump_digest, s.thumbnail, s.owner_id, s.project_id, s.shared, \
     s.is_arduino, s.copied_from, \
     ARRAY(SELECT l.library_id FROM state_save_libraries l \
           WHERE l.save_row_id = s.id ORDER BY l.library_id) AS esim_libraries, \
     s.create_time, s.save_time";

/// PostgreSQL-backed [`SaveRepository`].
#[derive(Debug, Clone)]
pub struct PgSaveRepository {
    pool: PgPool,
}

impl PgSaveRepository {
    /// Create a new save repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_db_error("Failed to begin transaction", e))
    }

    async fn find_row(
        tx: &mut Transaction<'static, Postgres>,
        id: Uuid,
    ) -> AppResult<StateSave> {
        sqlx::query_as::<_, StateSave>(&format!(
            "SELECT {SAVE_COLUMNS} FROM state_saves s WHERE s.id = $1"
        ))
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_db_error("Failed to reload save", e))
    }

    async fn replace_libraries(
        tx: &mut Transaction<'static, Postgres>,
        row_id: Uuid,
        libraries: &[Uuid],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM state_save_libraries WHERE save_row_id = $1")
            .bind(row_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_db_error("Failed to clear save libraries", e))?;

        if libraries.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO state_save_libraries (save_row_id, library_id) \
             SELECT $1, lib FROM UNNEST($2::uuid[]) AS lib ON CONFLICT DO NOTHING",
        )
        .bind(row_id)
        .bind(libraries)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_db_error("Failed to attach save libraries", e))?;
        Ok(())
    }

    async fn insert_in(
        tx: &mut Transaction<'static, Postgres>,
        data: &NewStateSave,
    ) -> AppResult<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO state_saves (id, save_id, version, branch, name, description, data_dump, \
             dump_digest, thumbnail, owner_id, project_id, shared, is_arduino, copied_from) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(data.save_id)
        .bind(data.version)
        .bind(&data.branch)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.data_dump)
        .bind(data.digest())
        .bind(&data.thumbnail)
        .bind(data.owner_id)
        .bind(data.project_id)
        .bind(data.shared)
        .bind(data.is_arduino)
        .bind(data.copied_from)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_db_error("Failed to create save", e))?;
        Ok(id)
    }

    async fn fetch_owner_rows(
        &self,
        sql: &str,
        owner_id: Uuid,
        context: &'static str,
    ) -> AppResult<Vec<StateSave>> {
        sqlx::query_as::<_, StateSave>(sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(context, e))
    }
}

fn push_search_filters(qb: &mut QueryBuilder<'_, Postgres>, owner_id: Uuid, filter: &SaveFilter) {
    qb.push(" WHERE s.owner_id = ").push_bind(owner_id);
    if let Some(name) = &filter.name {
        qb.push(" AND s.name ILIKE ")
            .push_bind(SaveFilter::like_pattern(name));
    }
    if let Some(description) = &filter.description {
        qb.push(" AND s.description ILIKE ")
            .push_bind(SaveFilter::like_pattern(description));
    }
    if let Some(save_time) = &filter.save_time {
        push_time_filter(qb, "s.save_time", save_time);
    }
    if let Some(create_time) = &filter.create_time {
        push_time_filter(qb, "s.create_time", create_time);
    }
    if let Some(is_arduino) = filter.is_arduino {
        qb.push(" AND s.is_arduino = ").push_bind(is_arduino);
    }
}

/// `to_char` pattern producing the same text as [`StateSave::timestamp_text`].
const TIME_TEXT_FORMAT: &str = "YYYY-MM-DD HH24:MI:SS.US";

/// Substring match on a timestamp rendered in UTC, whatever the session
/// time zone.
fn push_time_filter(qb: &mut QueryBuilder<'_, Postgres>, column: &str, needle: &str) {
    qb.push(format!(
        " AND to_char({column} AT TIME ZONE 'UTC', '{TIME_TEXT_FORMAT}') ILIKE "
    ))
    .push_bind(SaveFilter::like_pattern(needle));
}

#[async_trait]
impl SaveRepository for PgSaveRepository {
    async fn upsert_by_content(&self, data: &NewStateSave) -> AppResult<UpsertOutcome> {
        let mut tx = self.begin().await?;

        let (id, inserted): (Uuid, bool) = sqlx::query_as(
            "INSERT INTO state_saves (id, save_id, version, branch, name, description, data_dump, \
             dump_digest, thumbnail, owner_id, project_id, shared, is_arduino, copied_from) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NULL) \
             ON CONFLICT (owner_id, dump_digest, branch) WHERE copied_from IS NULL \
             DO UPDATE SET name = EXCLUDED.name, description = EXCLUDED.description, \
             save_time = NOW() \
             RETURNING id, (xmax = 0) AS inserted",
        )
        .bind(Uuid::new_v4())
        .bind(data.save_id)
        .bind(data.version)
        .bind(&data.branch)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.data_dump)
        .bind(data.digest())
        .bind(&data.thumbnail)
        .bind(data.owner_id)
        .bind(data.project_id)
        .bind(data.shared)
        .bind(data.is_arduino)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_db_error("Failed to upsert save", e))?;

        if inserted {
            Self::replace_libraries(&mut tx, id, &data.esim_libraries).await?;
        }

        let save = Self::find_row(&mut tx, id).await?;
        tx.commit()
            .await
            .map_err(|e| map_db_error("Failed to commit save", e))?;

        debug!(save_id = %save.save_id, duplicate = !inserted, "Upserted save row");
        Ok(UpsertOutcome {
            save,
            duplicate: !inserted,
        })
    }

    async fn insert(&self, data: &NewStateSave) -> AppResult<StateSave> {
        let mut tx = self.begin().await?;
        let id = Self::insert_in(&mut tx, data).await?;
        Self::replace_libraries(&mut tx, id, &data.esim_libraries).await?;
        let save = Self::find_row(&mut tx, id).await?;
        tx.commit()
            .await
            .map_err(|e| map_db_error("Failed to commit save", e))?;
        Ok(save)
    }

    async fn find_by_triple(
        &self,
        save_id: Uuid,
        version: i32,
        branch: &str,
    ) -> AppResult<Option<StateSave>> {
        sqlx::query_as::<_, StateSave>(&format!(
            "SELECT {SAVE_COLUMNS} FROM state_saves s \
             WHERE s.save_id = $1 AND s.version = $2 AND s.branch = $3"
        ))
        .bind(save_id)
        .bind(version)
        .bind(branch)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to find save", e))
    }

    async fn find_latest(&self, save_id: Uuid) -> AppResult<Option<StateSave>> {
        sqlx::query_as::<_, StateSave>(&format!(
            "SELECT {SAVE_COLUMNS} FROM state_saves s WHERE s.save_id = $1 \
             ORDER BY s.save_time DESC, s.version DESC LIMIT 1"
        ))
        .bind(save_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to find save", e))
    }

    async fn max_version(&self, save_id: Uuid, branch: &str) -> AppResult<Option<i32>> {
        sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(version) FROM state_saves WHERE save_id = $1 AND branch = $2",
        )
        .bind(save_id)
        .bind(branch)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to read latest version", e))
    }

    async fn update(&self, save: &StateSave) -> AppResult<StateSave> {
        let mut tx = self.begin().await?;

        let affected = sqlx::query(
            "UPDATE state_saves SET data_dump = $2, dump_digest = $3, shared = $4, name = $5, \
             description = $6, thumbnail = $7, save_time = NOW() WHERE id = $1",
        )
        .bind(save.id)
        .bind(&save.data_dump)
        .bind(content_digest(&save.data_dump))
        .bind(save.shared)
        .bind(&save.name)
        .bind(&save.description)
        .bind(&save.thumbnail)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_db_error("Failed to update save", e))?
        .rows_affected();

        if affected == 0 {
            return Err(AppError::not_found(format!("Save {} not found", save.save_id)));
        }

        Self::replace_libraries(&mut tx, save.id, &save.esim_libraries).await?;
        let updated = Self::find_row(&mut tx, save.id).await?;
        tx.commit()
            .await
            .map_err(|e| map_db_error("Failed to commit save", e))?;
        Ok(updated)
    }

    async fn delete_with_project(&self, save: &StateSave) -> AppResult<bool> {
        let mut tx = self.begin().await?;

        if let Some(project_id) = save.project_id {
            sqlx::query("DELETE FROM projects WHERE project_id = $1")
                .bind(project_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_db_error("Failed to delete linked project", e))?;
        }

        let result = sqlx::query("DELETE FROM state_saves WHERE id = $1")
            .bind(save.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_error("Failed to delete save", e))?;

        tx.commit()
            .await
            .map_err(|e| map_db_error("Failed to commit delete", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<StateSave>> {
        self.fetch_owner_rows(
            &format!(
                "SELECT {SAVE_COLUMNS} FROM state_saves s WHERE s.owner_id = $1 \
                 ORDER BY s.save_time DESC"
            ),
            owner_id,
            "Failed to list saves",
        )
        .await
    }

    async fn list_latest_per_save(&self, owner_id: Uuid) -> AppResult<Vec<StateSave>> {
        self.fetch_owner_rows(
            &format!(
                "SELECT * FROM (SELECT DISTINCT ON (s.save_id) {SAVE_COLUMNS} \
                 FROM state_saves s WHERE s.owner_id = $1 \
                 ORDER BY s.save_id, s.save_time DESC) latest \
                 ORDER BY latest.save_time DESC"
            ),
            owner_id,
            "Failed to list latest saves",
        )
        .await
    }

    async fn list_arduino(&self, owner_id: Uuid) -> AppResult<Vec<StateSave>> {
        self.fetch_owner_rows(
            &format!(
                "SELECT {SAVE_COLUMNS} FROM state_saves s \
                 WHERE s.owner_id = $1 AND s.is_arduino = TRUE ORDER BY s.save_time DESC"
            ),
            owner_id,
            "Failed to list Arduino saves",
        )
        .await
    }

    async fn search(
        &self,
        owner_id: Uuid,
        filter: &SaveFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<StateSave>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM state_saves s");
        push_search_filters(&mut count, owner_id, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error("Failed to count search results", e))?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SAVE_COLUMNS} FROM state_saves s"
        ));
        push_search_filters(&mut query, owner_id, filter);
        query
            .push(" ORDER BY s.save_time DESC LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let saves = query
            .build_query_as::<StateSave>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("Failed to search saves", e))?;

        Ok(PageResponse::new(
            saves,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    async fn list_versions(&self, owner_id: Uuid, save_id: Uuid) -> AppResult<Vec<StateSave>> {
        sqlx::query_as::<_, StateSave>(&format!(
            "SELECT {SAVE_COLUMNS} FROM state_saves s \
             WHERE s.owner_id = $1 AND s.save_id = $2 ORDER BY s.save_time DESC"
        ))
        .bind(owner_id)
        .bind(save_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to list versions", e))
    }

    async fn find_owned_triple(
        &self,
        owner_id: Uuid,
        save_id: Uuid,
        version: i32,
        branch: &str,
    ) -> AppResult<Option<StateSave>> {
        sqlx::query_as::<_, StateSave>(&format!(
            "SELECT {SAVE_COLUMNS} FROM state_saves s \
             WHERE s.owner_id = $1 AND s.save_id = $2 AND s.version = $3 AND s.branch = $4"
        ))
        .bind(owner_id)
        .bind(save_id)
        .bind(version)
        .bind(branch)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to find save version", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_filters_render_in_utc() {
        let filter = SaveFilter {
            save_time: Some("2024-03".to_string()),
            create_time: Some("10:20".to_string()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT s.id FROM state_saves s");
        push_search_filters(&mut qb, Uuid::new_v4(), &filter);

        let sql = qb.sql();
        assert!(sql.contains(
            "to_char(s.save_time AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS.US') ILIKE $2"
        ));
        assert!(sql.contains(
            "to_char(s.create_time AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS.US') ILIKE $3"
        ));
        assert!(!sql.contains("::text"));
    }
}
