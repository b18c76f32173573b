//! Thumbnail storage configuration.

use serde::{Deserialize, Serialize};

/// Where decoded save thumbnails are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving thumbnail files.
    #[serde(default = "default_thumbnail_dir")]
    pub thumbnail_dir: String,
    /// Maximum decoded thumbnail size in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    /// Maximum request body size in bytes (data dumps can be large).
    #[serde(default = "default_max_body")]
    pub max_body_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            thumbnail_dir: default_thumbnail_dir(),
            max_image_bytes: default_max_image_bytes(),
            max_body_bytes: default_max_body(),
        }
    }
}

fn default_thumbnail_dir() -> String {
    "data/thumbnails".to_string()
}

fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_max_body() -> usize {
    32 * 1024 * 1024
}
