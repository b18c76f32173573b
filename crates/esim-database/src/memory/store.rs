//! In-memory store backing every repository trait.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use esim_core::error::AppError;
use esim_core::result::AppResult;
use esim_core::types::pagination::{PageRequest, PageResponse};
use esim_entity::library::EsimLibrary;
use esim_entity::permission::RolePermission;
use esim_entity::project::Project;
use esim_entity::save::{NewStateSave, SaveFilter, StateSave, content_digest};
use esim_entity::user::User;

use crate::repositories::{
    DUPLICATE_CONTENT_MESSAGE, DUPLICATE_TRIPLE_MESSAGE, LibraryRepository, PermissionRepository,
    ProjectRepository, SaveRepository, UpsertOutcome, UserRepository,
};

#[derive(Debug, Default)]
struct Tables {
    saves: Vec<StateSave>,
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    libraries: HashMap<Uuid, EsimLibrary>,
    user_roles: HashMap<Uuid, HashSet<Uuid>>,
    permissions: Vec<RolePermission>,
    last_write: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing write timestamp, so "newest first" is total.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_write {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_write = Some(stamp);
        stamp
    }

    fn triple_taken(&self, save_id: Uuid, version: i32, branch: &str) -> bool {
        self.saves
            .iter()
            .any(|s| s.matches_triple(save_id, version, branch))
    }

    fn content_match(&self, owner_id: Uuid, digest: &str, branch: &str) -> Option<usize> {
        self.saves.iter().position(|s| {
            s.copied_from.is_none()
                && s.owner_id == owner_id
                && s.dump_digest == digest
                && s.branch == branch
        })
    }

    fn insert_row(&mut self, data: &NewStateSave) -> AppResult<StateSave> {
        if self.triple_taken(data.save_id, data.version, &data.branch) {
            return Err(AppError::conflict(DUPLICATE_TRIPLE_MESSAGE));
        }
        let now = self.tick();
        let row = data.clone().into_row(Uuid::new_v4(), now);
        self.saves.push(row.clone());
        Ok(row)
    }

    fn owned_newest_first(
        &self,
        owner_id: Uuid,
        keep: impl Fn(&StateSave) -> bool,
    ) -> Vec<StateSave> {
        let mut rows: Vec<StateSave> = self
            .saves
            .iter()
            .filter(|s| s.owner_id == owner_id && keep(s))
            .cloned()
            .collect();
        sort_newest_first(&mut rows);
        rows
    }
}

fn sort_newest_first(rows: &mut [StateSave]) {
    rows.sort_by(|a, b| b.save_time.cmp(&a.save_time));
}

/// Thread-safe in-memory store implementing all repository traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project.
    pub async fn insert_project(&self, project: Project) {
        self.tables
            .write()
            .await
            .projects
            .insert(project.project_id, project);
    }

    /// Register a component library.
    pub async fn insert_library(&self, library: EsimLibrary) {
        self.tables
            .write()
            .await
            .libraries
            .insert(library.id, library);
    }

    /// Add `user_id` to `role_id`.
    pub async fn assign_role(&self, user_id: Uuid, role_id: Uuid) {
        self.tables
            .write()
            .await
            .user_roles
            .entry(user_id)
            .or_default()
            .insert(role_id);
    }

    /// Allow members of `role_id` to delete own saves in workflow `state_id`.
    pub async fn grant_delete_in_state(&self, role_id: Uuid, state_id: Uuid) {
        self.tables.write().await.permissions.push(RolePermission {
            id: Uuid::new_v4(),
            role_id,
            del_own_states: state_id,
        });
    }

    /// Whether a project still exists.
    pub async fn has_project(&self, project_id: Uuid) -> bool {
        self.tables.read().await.projects.contains_key(&project_id)
    }

    /// Number of stored save rows.
    pub async fn save_count(&self) -> usize {
        self.tables.read().await.saves.len()
    }
}

#[async_trait]
impl SaveRepository for MemoryStore {
    async fn upsert_by_content(&self, data: &NewStateSave) -> AppResult<UpsertOutcome> {
        let mut tables = self.tables.write().await;

        if let Some(index) = tables.content_match(data.owner_id, &data.digest(), &data.branch) {
            let now = tables.tick();
            let existing = &mut tables.saves[index];
            existing.name = data.name.clone();
            existing.description = data.description.clone();
            existing.save_time = now;
            debug!(save_id = %existing.save_id, "Reused save with identical content");
            return Ok(UpsertOutcome {
                save: existing.clone(),
                duplicate: true,
            });
        }

        let mut fresh = data.clone();
        fresh.copied_from = None;
        let save = tables.insert_row(&fresh)?;
        Ok(UpsertOutcome {
            save,
            duplicate: false,
        })
    }

    async fn insert(&self, data: &NewStateSave) -> AppResult<StateSave> {
        self.tables.write().await.insert_row(data)
    }

    async fn find_by_triple(
        &self,
        save_id: Uuid,
        version: i32,
        branch: &str,
    ) -> AppResult<Option<StateSave>> {
        let tables = self.tables.read().await;
        Ok(tables
            .saves
            .iter()
            .find(|s| s.matches_triple(save_id, version, branch))
            .cloned())
    }

    async fn find_latest(&self, save_id: Uuid) -> AppResult<Option<StateSave>> {
        let tables = self.tables.read().await;
        Ok(tables
            .saves
            .iter()
            .filter(|s| s.save_id == save_id)
            .max_by_key(|s| s.save_time)
            .cloned())
    }

    async fn max_version(&self, save_id: Uuid, branch: &str) -> AppResult<Option<i32>> {
        let tables = self.tables.read().await;
        Ok(tables
            .saves
            .iter()
            .filter(|s| s.save_id == save_id && s.branch == branch)
            .map(|s| s.version)
            .max())
    }

    async fn update(&self, save: &StateSave) -> AppResult<StateSave> {
        let mut tables = self.tables.write().await;
        let index = tables
            .saves
            .iter()
            .position(|s| s.id == save.id)
            .ok_or_else(|| AppError::not_found(format!("Save {} not found", save.save_id)))?;

        let digest = content_digest(&save.data_dump);
        if save.copied_from.is_none()
            && let Some(other) = tables.content_match(save.owner_id, &digest, &save.branch)
            && other != index
        {
            return Err(AppError::conflict(DUPLICATE_CONTENT_MESSAGE));
        }

        let now = tables.tick();
        let row = &mut tables.saves[index];
        row.data_dump = save.data_dump.clone();
        row.dump_digest = digest;
        row.shared = save.shared;
        row.name = save.name.clone();
        row.description = save.description.clone();
        row.thumbnail = save.thumbnail.clone();
        row.esim_libraries = save.esim_libraries.clone();
        row.save_time = now;
        Ok(row.clone())
    }

    async fn delete_with_project(&self, save: &StateSave) -> AppResult<bool> {
        let mut tables = self.tables.write().await;

        if let Some(project_id) = save.project_id {
            tables.projects.remove(&project_id);
            for row in tables.saves.iter_mut() {
                if row.project_id == Some(project_id) {
                    row.project_id = None;
                }
            }
        }

        let before = tables.saves.len();
        tables.saves.retain(|s| s.id != save.id);
        Ok(tables.saves.len() < before)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<StateSave>> {
        Ok(self
            .tables
            .read()
            .await
            .owned_newest_first(owner_id, |_| true))
    }

    async fn list_latest_per_save(&self, owner_id: Uuid) -> AppResult<Vec<StateSave>> {
        let tables = self.tables.read().await;
        let mut latest: HashMap<Uuid, &StateSave> = HashMap::new();
        for row in tables.saves.iter().filter(|s| s.owner_id == owner_id) {
            latest
                .entry(row.save_id)
                .and_modify(|current| {
                    if row.save_time > current.save_time {
                        *current = row;
                    }
                })
                .or_insert(row);
        }
        let mut rows: Vec<StateSave> = latest.into_values().cloned().collect();
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    async fn list_arduino(&self, owner_id: Uuid) -> AppResult<Vec<StateSave>> {
        Ok(self
            .tables
            .read()
            .await
            .owned_newest_first(owner_id, |s| s.is_arduino))
    }

    async fn search(
        &self,
        owner_id: Uuid,
        filter: &SaveFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<StateSave>> {
        let rows = self
            .tables
            .read()
            .await
            .owned_newest_first(owner_id, |s| filter.matches(s));
        Ok(PageResponse::from_all(rows, page))
    }

    async fn list_versions(&self, owner_id: Uuid, save_id: Uuid) -> AppResult<Vec<StateSave>> {
        Ok(self
            .tables
            .read()
            .await
            .owned_newest_first(owner_id, |s| s.save_id == save_id))
    }

    async fn find_owned_triple(
        &self,
        owner_id: Uuid,
        save_id: Uuid,
        version: i32,
        branch: &str,
    ) -> AppResult<Option<StateSave>> {
        let tables = self.tables.read().await;
        Ok(tables
            .saves
            .iter()
            .find(|s| s.owner_id == owner_id && s.matches_triple(save_id, version, branch))
            .cloned())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn find_by_id(&self, project_id: Uuid) -> AppResult<Option<Project>> {
        Ok(self.tables.read().await.projects.get(&project_id).cloned())
    }
}

#[async_trait]
impl PermissionRepository for MemoryStore {
    async fn can_delete_own_in_state(&self, user_id: Uuid, state_id: Uuid) -> AppResult<bool> {
        let tables = self.tables.read().await;
        let Some(roles) = tables.user_roles.get(&user_id) else {
            return Ok(false);
        };
        Ok(tables
            .permissions
            .iter()
            .any(|p| p.del_own_states == state_id && roles.contains(&p.role_id)))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn ensure(&self, id: Uuid, username: &str) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .entry(id)
            .and_modify(|u| u.username = username.to_string())
            .or_insert_with(|| User::new(id, username));
        Ok(user.clone())
    }
}

#[async_trait]
impl LibraryRepository for MemoryStore {
    async fn find_missing(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter(|id| !tables.libraries.contains_key(id))
            .copied()
            .collect())
    }
}
