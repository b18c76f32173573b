//! Library reference entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A component library a saved circuit depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EsimLibrary {
    /// Unique library identifier.
    pub id: Uuid,
    /// Library name as shown in the editor.
    pub library_name: String,
    /// The user who uploaded the library, if not a default library.
    pub owner_id: Option<Uuid>,
    /// When the library was registered.
    pub created_at: DateTime<Utc>,
}
