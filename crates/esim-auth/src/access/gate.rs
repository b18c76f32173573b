//! Access decisions for save rows.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use esim_core::error::AppError;
use esim_core::result::AppResult;
use esim_database::Repositories;
use esim_database::repositories::{PermissionRepository, ProjectRepository};
use esim_entity::save::StateSave;

/// What the actor wants to do with a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Fetch the snapshot, or use it as a copy source.
    Read,
    /// Change fields or the sharing flag.
    Modify,
    /// Remove the row (and its linked project).
    Delete,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Modify => write!(f, "modify"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Decides whether an actor may exercise a capability on a save.
///
/// | Capability | Allowed when |
/// |---|---|
/// | `Read` | actor owns the save, or the save is shared |
/// | `Modify` | actor owns the save |
/// | `Delete` | actor owns the save, and it links no project or one of the actor's roles may delete own saves in the project's workflow state |
#[derive(Debug, Clone)]
pub struct AccessGate {
    projects: Arc<dyn ProjectRepository>,
    permissions: Arc<dyn PermissionRepository>,
}

impl AccessGate {
    /// Creates a gate over the given collaborator stores.
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        permissions: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self {
            projects,
            permissions,
        }
    }

    /// Creates a gate from a repository set.
    pub fn from_repositories(repos: &Repositories) -> Self {
        Self::new(repos.projects.clone(), repos.permissions.clone())
    }

    /// Returns `Ok(())` when allowed, or an `Unauthorized` error carrying no
    /// save fields otherwise.
    pub async fn authorize(
        &self,
        actor: Option<Uuid>,
        save: &StateSave,
        capability: Capability,
    ) -> AppResult<()> {
        if self.is_allowed(actor, save, capability).await? {
            Ok(())
        } else {
            debug!(%capability, "Access denied");
            Err(AppError::unauthorized(
                "You are not authorized to perform this action",
            ))
        }
    }

    /// Evaluates the rule table.
    pub async fn is_allowed(
        &self,
        actor: Option<Uuid>,
        save: &StateSave,
        capability: Capability,
    ) -> AppResult<bool> {
        let is_owner = actor.is_some_and(|id| save.is_owned_by(id));
        match capability {
            Capability::Read => Ok(is_owner || save.shared),
            Capability::Modify => Ok(is_owner),
            Capability::Delete => {
                let Some(actor) = actor.filter(|_| is_owner) else {
                    return Ok(false);
                };
                let Some(project_id) = save.project_id else {
                    return Ok(true);
                };
                match self.projects.find_by_id(project_id).await? {
                    Some(project) => {
                        self.permissions
                            .can_delete_own_in_state(actor, project.state_id)
                            .await
                    }
                    None => Ok(true),
                }
            }
        }
    }
}
