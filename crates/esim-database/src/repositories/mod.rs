//! Repository traits and their PostgreSQL implementations.
//!
//! The service layer depends only on the traits; [`crate::Repositories`]
//! binds them to either the PostgreSQL implementations in this module or
//! the in-memory [`crate::MemoryStore`].

pub mod library;
pub mod permission;
pub mod project;
pub mod save;
pub mod user;

use async_trait::async_trait;
use uuid::Uuid;

use esim_core::error::{AppError, ErrorKind};
use esim_core::result::AppResult;
use esim_core::types::pagination::{PageRequest, PageResponse};
use esim_entity::project::Project;
use esim_entity::save::{NewStateSave, SaveFilter, StateSave};
use esim_entity::user::User;

pub use library::PgLibraryRepository;
pub use permission::PgPermissionRepository;
pub use project::PgProjectRepository;
pub use save::PgSaveRepository;
pub use user::PgUserRepository;

/// Result of a dedup-by-content upsert.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    /// The stored row (new, or the existing one with refreshed metadata).
    pub save: StateSave,
    /// Whether an existing row with the same content and branch was reused.
    pub duplicate: bool,
}

/// Storage of save rows.
#[async_trait]
pub trait SaveRepository: Send + Sync + std::fmt::Debug {
    /// Insert a new save, or, when the owner already has a non-copy row with
    /// the same content digest and branch, refresh that row's name and
    /// description instead. Atomic with respect to concurrent submissions.
    async fn upsert_by_content(&self, data: &NewStateSave) -> AppResult<UpsertOutcome>;

    /// Insert a row without dedup (used for copies).
    async fn insert(&self, data: &NewStateSave) -> AppResult<StateSave>;

    /// Find the row identified by a snapshot triple.
    async fn find_by_triple(
        &self,
        save_id: Uuid,
        version: i32,
        branch: &str,
    ) -> AppResult<Option<StateSave>>;

    /// Find the most recently saved row sharing `save_id`.
    async fn find_latest(&self, save_id: Uuid) -> AppResult<Option<StateSave>>;

    /// Highest version recorded for `save_id` on `branch`.
    async fn max_version(&self, save_id: Uuid, branch: &str) -> AppResult<Option<i32>>;

    /// Persist the mutable fields of an existing row and bump `save_time`.
    async fn update(&self, save: &StateSave) -> AppResult<StateSave>;

    /// Delete a row, deleting its linked project first, in one unit of work.
    async fn delete_with_project(&self, save: &StateSave) -> AppResult<bool>;

    /// All rows of an owner, newest `save_time` first.
    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<StateSave>>;

    /// The newest row per distinct `save_id` of an owner, newest first.
    async fn list_latest_per_save(&self, owner_id: Uuid) -> AppResult<Vec<StateSave>>;

    /// An owner's Arduino rows, newest first.
    async fn list_arduino(&self, owner_id: Uuid) -> AppResult<Vec<StateSave>>;

    /// Filtered, paginated search over an owner's rows, newest first.
    async fn search(
        &self,
        owner_id: Uuid,
        filter: &SaveFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<StateSave>>;

    /// All of an owner's rows sharing `save_id`, newest first.
    async fn list_versions(&self, owner_id: Uuid, save_id: Uuid) -> AppResult<Vec<StateSave>>;

    /// Exact snapshot lookup restricted to an owner.
    async fn find_owned_triple(
        &self,
        owner_id: Uuid,
        save_id: Uuid,
        version: i32,
        branch: &str,
    ) -> AppResult<Option<StateSave>>;
}

/// Read access to published projects.
#[async_trait]
pub trait ProjectRepository: Send + Sync + std::fmt::Debug {
    /// Find a project by ID.
    async fn find_by_id(&self, project_id: Uuid) -> AppResult<Option<Project>>;
}

/// Role-based workflow permissions.
#[async_trait]
pub trait PermissionRepository: Send + Sync + std::fmt::Debug {
    /// Whether any role of `user_id` may delete own saves in workflow `state_id`.
    async fn can_delete_own_in_state(&self, user_id: Uuid, state_id: Uuid) -> AppResult<bool>;
}

/// User identity records.
#[async_trait]
pub trait UserRepository: Send + Sync + std::fmt::Debug {
    /// Find a user by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Record the user named in a verified token, refreshing the username.
    async fn ensure(&self, id: Uuid, username: &str) -> AppResult<User>;
}

/// Component library references.
#[async_trait]
pub trait LibraryRepository: Send + Sync + std::fmt::Debug {
    /// Return the IDs among `ids` that do not name a known library.
    async fn find_missing(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>>;
}

/// Map a sqlx error, turning unique violations into conflicts.
pub(crate) fn map_db_error(context: &'static str, err: sqlx::Error) -> AppError {
    let message = err
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| conflict_message(db.constraint()));
    match message {
        Some(message) => AppError::with_source(ErrorKind::Conflict, message, err),
        None => AppError::with_source(ErrorKind::Database, context, err),
    }
}

/// Client-facing message for a violated unique constraint.
fn conflict_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(OWNER_CONTENT_INDEX) => DUPLICATE_CONTENT_MESSAGE,
        Some(TRIPLE_INDEX) => DUPLICATE_TRIPLE_MESSAGE,
        _ => DUPLICATE_RECORD_MESSAGE,
    }
}

/// Unique index enforcing dedup-by-content per owner and branch.
pub(crate) const OWNER_CONTENT_INDEX: &str = "state_saves_owner_content_key";

/// Unique index on `(save_id, version, branch)`.
pub(crate) const TRIPLE_INDEX: &str = "state_saves_triple_key";

pub(crate) const DUPLICATE_TRIPLE_MESSAGE: &str =
    "A save with this save_id, version and branch already exists";

pub(crate) const DUPLICATE_CONTENT_MESSAGE: &str =
    "You already have a save with identical content on this branch";

const DUPLICATE_RECORD_MESSAGE: &str = "The request conflicts with an existing record";
