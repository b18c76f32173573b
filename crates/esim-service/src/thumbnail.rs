//! Decoding and storage of save thumbnails.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use esim_core::config::StorageConfig;
use esim_core::error::{AppError, ErrorKind};
use esim_core::result::AppResult;

/// A decoded, verified thumbnail image.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl Thumbnail {
    /// Raw image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Detected image format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// File extension for the detected format.
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }
}

/// Writes thumbnails below a local directory.
#[derive(Debug, Clone)]
pub struct ThumbnailStore {
    root: PathBuf,
    max_bytes: usize,
}

impl ThumbnailStore {
    /// Creates a store from storage configuration.
    pub fn new(config: &StorageConfig) -> Self {
        Self::with_root(&config.thumbnail_dir, config.max_image_bytes)
    }

    /// Creates a store rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Directory thumbnails are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decode a base64 image, optionally given as a `data:` URL.
    ///
    /// Rejects payloads that are not valid base64, exceed the size limit, or
    /// do not decode as a supported image.
    pub fn decode(&self, encoded: &str) -> AppResult<Thumbnail> {
        let payload = match encoded.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => encoded,
        };
        let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

        let bytes = STANDARD
            .decode(payload.as_bytes())
            .map_err(|e| AppError::validation(format!("base64_image is not valid base64: {e}")))?;

        if bytes.len() > self.max_bytes {
            return Err(AppError::validation(format!(
                "base64_image exceeds the {} byte limit",
                self.max_bytes
            )));
        }

        let format = image::guess_format(&bytes)
            .map_err(|_| AppError::validation("base64_image is not a recognised image"))?;
        image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| AppError::validation(format!("base64_image could not be decoded: {e}")))?;

        Ok(Thumbnail { bytes, format })
    }

    /// Write a thumbnail for `save_id` and return its path relative to the root.
    pub async fn store(&self, save_id: Uuid, thumbnail: &Thumbnail) -> AppResult<String> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create thumbnail directory: {}", self.root.display()),
                e,
            )
        })?;

        let relative = format!(
            "{save_id}_{}.{}",
            Uuid::new_v4().simple(),
            thumbnail.extension()
        );
        let path = self.root.join(&relative);
        fs::write(&path, thumbnail.bytes()).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write thumbnail: {}", path.display()),
                e,
            )
        })?;

        debug!(%save_id, path = %path.display(), "Stored thumbnail");
        Ok(relative)
    }

    /// Best-effort removal of a stored thumbnail.
    pub async fn remove(&self, relative: &str) {
        let path = self.root.join(relative);
        if let Err(e) = fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove thumbnail");
        }
    }
}
