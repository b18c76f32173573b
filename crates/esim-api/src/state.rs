//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use esim_auth::JwtDecoder;
use esim_core::config::AppConfig;
use esim_database::{DatabasePool, Repositories};
use esim_service::{SaveService, ThumbnailStore};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are cheap to clone across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// PostgreSQL pool; `None` when running on the in-memory store
    pub db_pool: Option<DatabasePool>,

    // ── Auth ─────────────────────────────────────────────────
    /// JWT token decoder and validator
    pub jwt_decoder: Arc<JwtDecoder>,

    // ── Services ─────────────────────────────────────────────
    /// Save record service
    pub save_service: Arc<SaveService>,
}

impl AppState {
    /// Wire the services over a repository set.
    pub fn new(config: AppConfig, repos: Repositories, db_pool: Option<DatabasePool>) -> Self {
        let thumbnails = Arc::new(ThumbnailStore::new(&config.storage));
        let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));
        let save_service = Arc::new(SaveService::new(repos, thumbnails));

        Self {
            config: Arc::new(config),
            db_pool,
            jwt_decoder,
            save_service,
        }
    }
}
