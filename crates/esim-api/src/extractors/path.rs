//! Typed path parameter helpers.

use uuid::Uuid;

use esim_core::error::AppError;

/// Parses a UUID from a path segment.
pub fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s).map_err(|_| AppError::invalid_identifier(format!("Invalid save id: {s}")))
}

/// Parses a version number from a path segment.
pub fn parse_version(s: &str) -> Result<i32, AppError> {
    s.parse::<i32>()
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| AppError::validation(format!("Invalid version: {s}")))
}

/// A parsed `{save_id}/{version}/{branch}` snapshot address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPath {
    /// Logical save identifier.
    pub save_id: Uuid,
    /// Version number.
    pub version: i32,
    /// Branch name.
    pub branch: String,
}

impl SnapshotPath {
    /// Parse raw path segments.
    pub fn parse(save_id: &str, version: &str, branch: String) -> Result<Self, AppError> {
        Ok(Self {
            save_id: parse_uuid(save_id)?,
            version: parse_version(version)?,
            branch,
        })
    }
}
