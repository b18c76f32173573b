//! Repository set that dispatches to the configured store.

use std::sync::Arc;

use tracing::info;

use esim_core::config::{DatabaseConfig, DatabaseProvider};
use esim_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::memory::MemoryStore;
use crate::repositories::{
    LibraryRepository, PermissionRepository, PgLibraryRepository, PgPermissionRepository,
    PgProjectRepository, PgSaveRepository, PgUserRepository, ProjectRepository, SaveRepository,
    UserRepository,
};

/// Every repository the service layer needs, bound to one store.
#[derive(Debug, Clone)]
pub struct Repositories {
    /// Save rows.
    pub saves: Arc<dyn SaveRepository>,
    /// Published projects.
    pub projects: Arc<dyn ProjectRepository>,
    /// Role permissions.
    pub permissions: Arc<dyn PermissionRepository>,
    /// Users.
    pub users: Arc<dyn UserRepository>,
    /// Component libraries.
    pub libraries: Arc<dyn LibraryRepository>,
}

impl Repositories {
    /// Bind all repositories to a PostgreSQL pool.
    pub fn postgres(pool: &DatabasePool) -> Self {
        let pg = pool.pool().clone();
        Self {
            saves: Arc::new(PgSaveRepository::new(pg.clone())),
            projects: Arc::new(PgProjectRepository::new(pg.clone())),
            permissions: Arc::new(PgPermissionRepository::new(pg.clone())),
            users: Arc::new(PgUserRepository::new(pg.clone())),
            libraries: Arc::new(PgLibraryRepository::new(pg)),
        }
    }

    /// Bind all repositories to one in-memory store.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            saves: store.clone(),
            projects: store.clone(),
            permissions: store.clone(),
            users: store.clone(),
            libraries: store,
        }
    }

    /// Build the repository set selected by configuration.
    ///
    /// Returns the PostgreSQL pool as well when one was opened, so the
    /// caller can health-check and close it.
    pub async fn from_config(config: &DatabaseConfig) -> AppResult<(Self, Option<DatabasePool>)> {
        match config.provider {
            DatabaseProvider::Postgres => {
                let pool = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    pool.migrate().await?;
                }
                Ok((Self::postgres(&pool), Some(pool)))
            }
            DatabaseProvider::Memory => {
                info!("Using in-memory store; data is lost on restart");
                Ok((Self::memory(Arc::new(MemoryStore::new())), None))
            }
        }
    }
}
