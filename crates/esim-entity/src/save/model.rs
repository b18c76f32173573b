//! State save entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

/// Name prefix given to copies.
pub const COPY_PREFIX: &str = "Copy of ";

/// A persisted snapshot of a project's editable state.
///
/// `(save_id, version, branch)` identifies a snapshot; `id` is the row key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StateSave {
    /// Row identifier.
    pub id: Uuid,
    /// Logical save identifier, shared by all versions and branches.
    pub save_id: Uuid,
    /// Revision number within `save_id`/`branch`.
    pub version: i32,
    /// Named variant line.
    pub branch: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Serialized editor state, opaque to the backend.
    pub data_dump: String,
    /// SHA-256 of `data_dump`, hex encoded.
    pub dump_digest: String,
    /// Relative path of the stored thumbnail.
    pub thumbnail: Option<String>,
    /// The owning user.
    pub owner_id: Uuid,
    /// Linked project, if the save was submitted for publication.
    pub project_id: Option<Uuid>,
    /// Whether non-owners may read this snapshot.
    pub shared: bool,
    /// Whether this is an Arduino sketch save.
    pub is_arduino: bool,
    /// `save_id` of the source when this row was produced by a copy.
    pub copied_from: Option<Uuid>,
    /// Referenced component libraries.
    pub esim_libraries: Vec<Uuid>,
    /// When the row was created.
    pub create_time: DateTime<Utc>,
    /// When the row was last written.
    pub save_time: DateTime<Utc>,
}

impl StateSave {
    /// Check whether `user_id` owns this save.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Check whether this row matches the given snapshot triple.
    pub fn matches_triple(&self, save_id: Uuid, version: i32, branch: &str) -> bool {
        self.save_id == save_id && self.version == version && self.branch == branch
    }

    /// Build the insert data for a copy of this save owned by `new_owner`.
    ///
    /// The copy gets a fresh `save_id`, no project link, a prefixed name,
    /// and starts private.
    pub fn copy_for(&self, new_owner: Uuid) -> NewStateSave {
        NewStateSave {
            save_id: Uuid::new_v4(),
            version: self.version,
            branch: self.branch.clone(),
            name: format!("{COPY_PREFIX}{}", self.name),
            description: self.description.clone(),
            data_dump: self.data_dump.clone(),
            thumbnail: self.thumbnail.clone(),
            owner_id: new_owner,
            project_id: None,
            shared: false,
            is_arduino: self.is_arduino,
            copied_from: Some(self.save_id),
            esim_libraries: self.esim_libraries.clone(),
        }
    }

    /// Text that `save_time`/`create_time` substring filters match against:
    /// UTC, microsecond precision, no offset suffix.
    pub fn timestamp_text(ts: &DateTime<Utc>) -> String {
        ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// Data required to insert a new save row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStateSave {
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
    /// Serialized editor state.
    pub data_dump: String,
    /// Stored thumbnail path.
    pub thumbnail: Option<String>,
    /// The owning user.
    pub owner_id: Uuid,
    /// Linked project.
    pub project_id: Option<Uuid>,
    /// Initial visibility.
    pub shared: bool,
    /// Arduino flag.
    pub is_arduino: bool,
    /// Copy source, if any.
    pub copied_from: Option<Uuid>,
    /// Referenced component libraries.
    pub esim_libraries: Vec<Uuid>,
}

impl NewStateSave {
    /// Digest used for dedup-by-content.
    pub fn digest(&self) -> String {
        content_digest(&self.data_dump)
    }

    /// Materialise a full row with the given identity and timestamp.
    pub fn into_row(self, id: Uuid, now: DateTime<Utc>) -> StateSave {
        let dump_digest = self.digest();
        StateSave {
            id,
            save_id: self.save_id,
            version: self.version,
            branch: self.branch,
            name: self.name,
            description: self.description,
            data_dump: self.data_dump,
            dump_digest,
            thumbnail: self.thumbnail,
            owner_id: self.owner_id,
            project_id: self.project_id,
            shared: self.shared,
            is_arduino: self.is_arduino,
            copied_from: self.copied_from,
            esim_libraries: self.esim_libraries,
            create_time: now,
            save_time: now,
        }
    }
}

/// Hex-encoded SHA-256 of a data dump.
pub fn content_digest(data_dump: &str) -> String {
    hex::encode(Sha256::digest(data_dump.as_bytes()))
}
