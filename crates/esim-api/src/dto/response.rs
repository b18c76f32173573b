//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use esim_entity::save::StateSave;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// A full snapshot, including its data dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    /// Logical save identifier.
    pub save_id: Uuid,
    /// Version number.
    pub version: i32,
    /// Branch name.
    pub branch: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Serialized editor state.
    pub data_dump: String,
    /// Stored thumbnail path.
    pub thumbnail: Option<String>,
    /// Owner: the username on fetch, the user id elsewhere.
    pub owner: String,
    /// Linked project.
    pub project_id: Option<Uuid>,
    /// Visibility flag.
    pub shared: bool,
    /// Arduino flag.
    pub is_arduino: bool,
    /// Referenced libraries.
    pub esim_libraries: Vec<Uuid>,
    /// Creation time.
    pub create_time: DateTime<Utc>,
    /// Last write time.
    pub save_time: DateTime<Utc>,
}

impl SaveResponse {
    /// Build a response whose `owner` is the given display value.
    pub fn with_owner(save: StateSave, owner: String) -> Self {
        Self {
            save_id: save.save_id,
            version: save.version,
            branch: save.branch,
            name: save.name,
            description: save.description,
            data_dump: save.data_dump,
            thumbnail: save.thumbnail,
            owner,
            project_id: save.project_id,
            shared: save.shared,
            is_arduino: save.is_arduino,
            esim_libraries: save.esim_libraries,
            create_time: save.create_time,
            save_time: save.save_time,
        }
    }
}

impl From<StateSave> for SaveResponse {
    fn from(save: StateSave) -> Self {
        let owner = save.owner_id.to_string();
        Self::with_owner(save, owner)
    }
}

/// Result of `POST /api/state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStateResponse {
    /// The stored snapshot.
    #[serde(flatten)]
    pub save: SaveResponse,
    /// Whether an existing save with identical content was reused.
    pub duplicate: bool,
}

/// Result of a copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyResponse {
    /// Identifier of the new save.
    pub save_id: Uuid,
}

/// Result of a delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Always `true`.
    pub done: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// `"connected"`, `"unreachable"`, or `"memory"`.
    pub database: String,
}
