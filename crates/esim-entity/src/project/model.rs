//! Project entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A project submitted for publication. A save may link at most one
/// project; deleting the save deletes the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Project {
    /// Unique project identifier.
    pub project_id: Uuid,
    /// Project title.
    pub title: String,
    /// Current workflow state.
    pub state_id: Uuid,
    /// The submitting user.
    pub author_id: Uuid,
    /// When the project was created.
    pub created_at: DateTime<Utc>,
}
