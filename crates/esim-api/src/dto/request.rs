//! Request DTOs with validation.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use esim_core::error::AppError;
use esim_core::types::pagination::PageRequest;
use esim_entity::save::SaveFilter;
use esim_service::{CreateSaveInput, UpdateSaveInput};

use crate::extractors::PaginationParams;

/// Run `validator` rules and map failures to a validation error.
pub fn validate_request<T: Validate>(req: &T) -> Result<(), AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string().replace('\n', "; ")))
}

/// Body of `POST /api/state`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateStateRequest {
    /// Existing logical save to add a version to.
    pub save_id: Option<Uuid>,
    /// Explicit version.
    #[validate(range(min = 1, message = "version must be at least 1"))]
    pub version: Option<i32>,
    /// Branch name.
    #[validate(
        required(message = "branch is required"),
        length(min = 1, message = "branch is required")
    )]
    pub branch: Option<String>,
    /// Display name.
    #[validate(
        required(message = "name is required"),
        length(min = 1, message = "name is required")
    )]
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Serialized editor state.
    #[validate(
        required(message = "data_dump is required"),
        length(min = 1, message = "data_dump is required")
    )]
    pub data_dump: Option<String>,
    /// Thumbnail as base64 or a `data:` URL.
    pub base64_image: Option<String>,
    /// Project to link.
    pub project_id: Option<Uuid>,
    /// Arduino flag.
    #[serde(default)]
    pub is_arduino: bool,
    /// Referenced libraries, as a list or a JSON-encoded list.
    #[serde(default, deserialize_with = "library_list")]
    pub esim_libraries: Vec<Uuid>,
}

impl From<CreateStateRequest> for CreateSaveInput {
    fn from(req: CreateStateRequest) -> Self {
        Self {
            save_id: req.save_id,
            version: req.version,
            branch: req.branch.unwrap_or_default(),
            name: req.name.unwrap_or_default(),
            description: req.description.unwrap_or_default(),
            data_dump: req.data_dump.unwrap_or_default(),
            base64_image: req.base64_image,
            project_id: req.project_id,
            is_arduino: req.is_arduino,
            esim_libraries: req.esim_libraries,
        }
    }
}

/// Body of `POST /api/state/{save_id}`.
///
/// Field rules live in the service so the 406 check on an empty payload
/// runs before them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStateRequest {
    /// Replacement editor state.
    pub data_dump: Option<String>,
    /// New visibility.
    pub shared: Option<bool>,
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New thumbnail.
    pub base64_image: Option<String>,
    /// Replacement library set.
    #[serde(default, deserialize_with = "optional_library_list")]
    pub esim_libraries: Option<Vec<Uuid>>,
}

impl From<UpdateStateRequest> for UpdateSaveInput {
    fn from(req: UpdateStateRequest) -> Self {
        Self {
            data_dump: req.data_dump,
            shared: req.shared,
            name: req.name,
            description: req.description,
            base64_image: req.base64_image,
            esim_libraries: req.esim_libraries,
        }
    }
}

/// Query of `GET /api/state/mine`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MineParams {
    /// Return every row instead of the newest per save.
    #[serde(default)]
    pub all: bool,
}

/// Query of `GET /api/state/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    /// Substring of the name.
    pub name: Option<String>,
    /// Substring of the description.
    pub description: Option<String>,
    /// Substring of the last-saved timestamp.
    pub save_time: Option<String>,
    /// Substring of the creation timestamp.
    pub create_time: Option<String>,
    /// Exact Arduino flag.
    pub is_arduino: Option<bool>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub per_page: Option<u64>,
}

impl SearchParams {
    /// Split into the store filter and page request; blank text filters are ignored.
    pub fn into_parts(self) -> (SaveFilter, PageRequest) {
        let defaults = PaginationParams::default();
        let page = PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
        .into_page_request();

        let filter = SaveFilter {
            name: non_blank(self.name),
            description: non_blank(self.description),
            save_time: non_blank(self.save_time),
            create_time: non_blank(self.create_time),
            is_arduino: self.is_arduino,
        };
        (filter, page)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LibraryList {
    Ids(Vec<Uuid>),
    Encoded(String),
}

impl LibraryList {
    fn into_ids<E: serde::de::Error>(self) -> Result<Vec<Uuid>, E> {
        match self {
            Self::Ids(ids) => Ok(ids),
            Self::Encoded(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Self::Encoded(raw) => serde_json::from_str(&raw)
                .map_err(|e| E::custom(format!("esim_libraries: {e}"))),
        }
    }
}

fn library_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Uuid>, D::Error> {
    LibraryList::deserialize(deserializer)?.into_ids()
}

fn optional_library_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<Uuid>>, D::Error> {
    Option::<LibraryList>::deserialize(deserializer)?
        .map(LibraryList::into_ids)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_libraries_accept_list_or_encoded_list() {
        let id = Uuid::new_v4();
        let listed: CreateStateRequest =
            serde_json::from_value(serde_json::json!({ "esim_libraries": [id] })).unwrap();
        assert_eq!(listed.esim_libraries, vec![id]);

        let encoded: CreateStateRequest = serde_json::from_value(
            serde_json::json!({ "esim_libraries": format!("[\"{id}\"]") }),
        )
        .unwrap();
        assert_eq!(encoded.esim_libraries, vec![id]);

        let update: UpdateStateRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(update.esim_libraries, None);
    }

    #[test]
    fn test_create_requires_fields() {
        let req = CreateStateRequest {
            branch: Some("main".to_string()),
            name: Some(String::new()),
            ..Default::default()
        };
        let err = validate_request(&req).unwrap_err();
        assert_eq!(err.kind, esim_core::error::ErrorKind::Validation);

        let ok = CreateStateRequest {
            branch: Some("main".to_string()),
            name: Some("LED".to_string()),
            data_dump: Some("{}".to_string()),
            ..Default::default()
        };
        assert!(validate_request(&ok).is_ok());
    }

    #[test]
    fn test_search_params_split() {
        let params = SearchParams {
            name: Some("blink".to_string()),
            description: Some(String::new()),
            is_arduino: Some(true),
            per_page: Some(5),
            ..Default::default()
        };
        let (filter, page) = params.into_parts();
        assert_eq!(filter.name.as_deref(), Some("blink"));
        assert_eq!(filter.description, None);
        assert_eq!(filter.is_arduino, Some(true));
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 5);
    }
}
