//! Create, fetch, update, and delete of save records.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use esim_auth::{AccessGate, Capability};
use esim_core::error::AppError;
use esim_core::result::AppResult;
use esim_database::Repositories;
use esim_database::repositories::UpsertOutcome;
use esim_entity::save::{NewStateSave, StateSave};

use crate::context::RequestContext;
use crate::thumbnail::{Thumbnail, ThumbnailStore};

/// Fields accepted when creating a save.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSaveInput {
    /// Existing logical save to add a version to; a fresh one when absent.
    pub save_id: Option<Uuid>,
    /// Explicit version; derived from existing versions when absent.
    pub version: Option<i32>,
    /// Branch name.
    pub branch: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Serialized editor state.
    pub data_dump: String,
    /// Thumbnail as base64 or a `data:` URL.
    pub base64_image: Option<String>,
    /// Project to link, if it exists.
    pub project_id: Option<Uuid>,
    /// Arduino flag.
    pub is_arduino: bool,
    /// Referenced component libraries.
    pub esim_libraries: Vec<Uuid>,
}

/// Fields accepted when updating a save; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSaveInput {
    /// Replacement editor state.
    pub data_dump: Option<String>,
    /// New visibility.
    pub shared: Option<bool>,
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New thumbnail.
    pub base64_image: Option<String>,
    /// Replacement library set.
    pub esim_libraries: Option<Vec<Uuid>>,
}

impl UpdateSaveInput {
    /// Whether the update carries a data dump or a sharing flag.
    pub fn is_actionable(&self) -> bool {
        self.data_dump.as_deref().is_some_and(|d| !d.is_empty()) || self.shared.is_some()
    }
}

/// A save together with its owner's username.
#[derive(Debug, Clone)]
pub struct OwnedSave {
    /// The row.
    pub save: StateSave,
    /// Username of `save.owner_id`.
    pub owner_name: String,
}

/// Implements the save record use cases.
#[derive(Debug, Clone)]
pub struct SaveService {
    /// Repository set.
    pub(crate) repos: Repositories,
    /// Access decisions.
    pub(crate) gate: AccessGate,
    /// Thumbnail storage.
    pub(crate) thumbnails: Arc<ThumbnailStore>,
}

impl SaveService {
    /// Creates a new save service.
    pub fn new(repos: Repositories, thumbnails: Arc<ThumbnailStore>) -> Self {
        let gate = AccessGate::from_repositories(&repos);
        Self {
            repos,
            gate,
            thumbnails,
        }
    }

    /// Create a save, or refresh the name and description of the caller's
    /// existing save with identical content on the same branch.
    pub async fn create_or_update(
        &self,
        ctx: &RequestContext,
        input: CreateSaveInput,
    ) -> AppResult<UpsertOutcome> {
        require_text("data_dump", &input.data_dump)?;
        require_text("branch", &input.branch)?;
        require_text("name", &input.name)?;
        if let Some(version) = input.version
            && version < 1
        {
            return Err(AppError::validation("version must be at least 1"));
        }

        self.check_libraries(&input.esim_libraries).await?;
        let thumbnail = self.decode_thumbnail(input.base64_image.as_deref())?;

        let project_id = match input.project_id {
            Some(id) => self.repos.projects.find_by_id(id).await?.map(|p| p.project_id),
            None => None,
        };

        let save_id = match input.save_id {
            Some(save_id) => {
                if let Some(existing) = self.repos.saves.find_latest(save_id).await? {
                    self.gate
                        .authorize(Some(ctx.user_id), &existing, Capability::Modify)
                        .await?;
                }
                save_id
            }
            None => Uuid::new_v4(),
        };

        let version = match input.version {
            Some(version) => version,
            None if input.save_id.is_some() => self
                .repos
                .saves
                .max_version(save_id, &input.branch)
                .await?
                .map_or(1, |v| v + 1),
            None => 1,
        };

        self.repos.users.ensure(ctx.user_id, &ctx.username).await?;

        // The file goes first so a storage failure leaves no row behind.
        let stored = match &thumbnail {
            Some(thumbnail) => Some(self.thumbnails.store(save_id, thumbnail).await?),
            None => None,
        };

        let data = NewStateSave {
            save_id,
            version,
            branch: input.branch,
            name: input.name,
            description: input.description,
            data_dump: input.data_dump,
            thumbnail: stored.clone(),
            owner_id: ctx.user_id,
            project_id,
            shared: false,
            is_arduino: input.is_arduino,
            copied_from: None,
            esim_libraries: input.esim_libraries,
        };

        let outcome = match self.repos.saves.upsert_by_content(&data).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Some(path) = &stored {
                    self.thumbnails.remove(path).await;
                }
                return Err(e);
            }
        };

        if outcome.duplicate {
            if let Some(path) = &stored {
                self.thumbnails.remove(path).await;
            }
            info!(
                user_id = %ctx.user_id,
                save_id = %outcome.save.save_id,
                "State save matched existing content"
            );
            return Ok(outcome);
        }

        info!(
            user_id = %ctx.user_id,
            save_id = %outcome.save.save_id,
            version = outcome.save.version,
            branch = %outcome.save.branch,
            "State save created"
        );
        Ok(outcome)
    }

    /// Fetch a snapshot. Anonymous callers may read shared saves.
    pub async fn fetch(
        &self,
        ctx: Option<&RequestContext>,
        save_id: Uuid,
        version: i32,
        branch: &str,
    ) -> AppResult<OwnedSave> {
        let save = self.find_triple(save_id, version, branch).await?;
        self.gate
            .authorize(ctx.map(|c| c.user_id), &save, Capability::Read)
            .await?;

        let owner = self
            .repos
            .users
            .find_by_id(save.owner_id)
            .await?
            .ok_or_else(|| AppError::serialization("Unable to resolve the save owner"))?;

        Ok(OwnedSave {
            save,
            owner_name: owner.username,
        })
    }

    /// Apply a partial update to the most recent row of `save_id`.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        save_id: Uuid,
        input: UpdateSaveInput,
    ) -> AppResult<StateSave> {
        if !input.is_actionable() {
            return Err(AppError::not_acceptable(
                "An update must include data_dump or shared",
            ));
        }
        if let Some(name) = &input.name {
            require_text("name", name)?;
        }

        let mut save = self
            .repos
            .saves
            .find_latest(save_id)
            .await?
            .ok_or_else(|| AppError::not_found("Save not found"))?;
        self.gate
            .authorize(Some(ctx.user_id), &save, Capability::Modify)
            .await?;

        if let Some(libraries) = &input.esim_libraries {
            self.check_libraries(libraries).await?;
        }
        let thumbnail = self.decode_thumbnail(input.base64_image.as_deref())?;

        if let Some(data_dump) = input.data_dump.filter(|d| !d.is_empty()) {
            save.data_dump = data_dump;
        }
        if let Some(shared) = input.shared {
            save.shared = shared;
        }
        if let Some(name) = input.name {
            save.name = name;
        }
        if let Some(description) = input.description {
            save.description = description;
        }
        if let Some(libraries) = input.esim_libraries {
            save.esim_libraries = libraries;
        }

        let stored = match &thumbnail {
            Some(thumbnail) => Some(self.thumbnails.store(save.save_id, thumbnail).await?),
            None => None,
        };
        if let Some(path) = &stored {
            save.thumbnail = Some(path.clone());
        }

        let updated = match self.repos.saves.update(&save).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(path) = &stored {
                    self.thumbnails.remove(path).await;
                }
                return Err(e);
            }
        };

        info!(
            user_id = %ctx.user_id,
            save_id = %updated.save_id,
            version = updated.version,
            "State save updated"
        );
        Ok(updated)
    }

    /// Delete a snapshot and its linked project.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        save_id: Uuid,
        version: i32,
        branch: &str,
    ) -> AppResult<()> {
        let save = self.find_triple(save_id, version, branch).await?;
        self.gate
            .authorize(Some(ctx.user_id), &save, Capability::Delete)
            .await?;

        if !self.repos.saves.delete_with_project(&save).await? {
            return Err(AppError::not_found("Save not found"));
        }

        info!(
            user_id = %ctx.user_id,
            save_id = %save_id,
            version,
            branch,
            project_id = ?save.project_id,
            "State save deleted"
        );
        Ok(())
    }

    pub(crate) async fn find_triple(
        &self,
        save_id: Uuid,
        version: i32,
        branch: &str,
    ) -> AppResult<StateSave> {
        self.repos
            .saves
            .find_by_triple(save_id, version, branch)
            .await?
            .ok_or_else(|| AppError::not_found("Save not found"))
    }

    async fn check_libraries(&self, libraries: &[Uuid]) -> AppResult<()> {
        let missing = self.repos.libraries.find_missing(libraries).await?;
        if missing.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = missing.iter().map(Uuid::to_string).collect();
        Err(AppError::validation(format!(
            "Unknown esim_libraries: {}",
            ids.join(", ")
        )))
    }

    fn decode_thumbnail(&self, encoded: Option<&str>) -> AppResult<Option<Thumbnail>> {
        encoded
            .filter(|s| !s.trim().is_empty())
            .map(|s| self.thumbnails.decode(s))
            .transpose()
    }
}

fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        Err(AppError::validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}
