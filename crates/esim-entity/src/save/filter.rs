//! Search filters over a user's saves.

use serde::{Deserialize, Serialize};

use super::model::StateSave;

/// Filters accepted by the save search.
///
/// Text fields are case-insensitive substring matches; `is_arduino` is an
/// exact match. Absent fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveFilter {
    /// Substring of the save name.
    pub name: Option<String>,
    /// Substring of the description.
    pub description: Option<String>,
    /// Substring of the last-saved timestamp text (e.g. `"2024-03"`).
    pub save_time: Option<String>,
    /// Substring of the creation timestamp text.
    pub create_time: Option<String>,
    /// Exact Arduino flag.
    pub is_arduino: Option<bool>,
}

impl SaveFilter {
    /// Evaluate the filter against a row.
    pub fn matches(&self, save: &StateSave) -> bool {
        contains_ci(&save.name, self.name.as_deref())
            && contains_ci(&save.description, self.description.as_deref())
            && contains_ci(
                &StateSave::timestamp_text(&save.save_time),
                self.save_time.as_deref(),
            )
            && contains_ci(
                &StateSave::timestamp_text(&save.create_time),
                self.create_time.as_deref(),
            )
            && self.is_arduino.is_none_or(|flag| save.is_arduino == flag)
    }

    /// Build a SQL `ILIKE` pattern for a substring filter.
    pub fn like_pattern(needle: &str) -> String {
        let escaped = needle
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{escaped}%")
    }
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
    }
}
