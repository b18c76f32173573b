//! Lightweight view of a save without its data dump.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::StateSave;

/// A save row as returned by listings and updates; omits `data_dump`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSummary {
    /// Logical save identifier.
    pub save_id: Uuid,
    /// Revision number.
    pub version: i32,
    /// Branch name.
    pub branch: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Stored thumbnail path.
    pub thumbnail: Option<String>,
    /// The owning user.
    pub owner_id: Uuid,
    /// Linked project.
    pub project_id: Option<Uuid>,
    /// Visibility flag.
    pub shared: bool,
    /// Arduino flag.
    pub is_arduino: bool,
    /// Referenced component libraries.
    pub esim_libraries: Vec<Uuid>,
    /// Creation time.
    pub create_time: DateTime<Utc>,
    /// Last write time.
    pub save_time: DateTime<Utc>,
}

impl From<&StateSave> for SaveSummary {
    fn from(save: &StateSave) -> Self {
        Self {
            save_id: save.save_id,
            version: save.version,
            branch: save.branch.clone(),
            name: save.name.clone(),
            description: save.description.clone(),
            thumbnail: save.thumbnail.clone(),
            owner_id: save.owner_id,
            project_id: save.project_id,
            shared: save.shared,
            is_arduino: save.is_arduino,
            esim_libraries: save.esim_libraries.clone(),
            create_time: save.create_time,
            save_time: save.save_time,
        }
    }
}

impl From<StateSave> for SaveSummary {
    fn from(save: StateSave) -> Self {
        Self::from(&save)
    }
}
