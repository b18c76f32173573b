//! State save handlers under `/api/state`.

use axum::Json;
use axum::extract::{Path, State};

use esim_core::types::pagination::PageResponse;
use esim_entity::save::SaveSummary;

use crate::dto::request::{
    CreateStateRequest, MineParams, SearchParams, UpdateStateRequest, validate_request,
};
use crate::dto::response::{
    ApiResponse, CopyResponse, CreateStateResponse, DeleteResponse, SaveResponse,
};
use crate::error::ApiError;
use crate::extractors::path::parse_uuid;
use crate::extractors::{ApiJson, ApiQuery, AuthUser, OptionalAuthUser, SnapshotPath};
use crate::state::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// POST /api/state
pub async fn create_state(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateStateRequest>,
) -> ApiResult<CreateStateResponse> {
    validate_request(&req)?;

    let outcome = state
        .save_service
        .create_or_update(&auth, req.into())
        .await?;

    Ok(Json(ApiResponse::ok(CreateStateResponse {
        save: outcome.save.into(),
        duplicate: outcome.duplicate,
    })))
}

/// POST /api/state/{save_id}/copy
pub async fn copy_state(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(save_id): Path<String>,
) -> ApiResult<CopyResponse> {
    let save_id = parse_uuid(&save_id)?;
    let copy = state.save_service.copy(&auth, save_id).await?;
    Ok(Json(ApiResponse::ok(CopyResponse {
        save_id: copy.save_id,
    })))
}

/// GET /api/state/{save_id}/{version}/{branch}
pub async fn fetch_state(
    State(state): State<AppState>,
    auth: OptionalAuthUser,
    Path((save_id, version, branch)): Path<(String, String, String)>,
) -> ApiResult<SaveResponse> {
    let path = SnapshotPath::parse(&save_id, &version, branch)?;
    let owned = state
        .save_service
        .fetch(auth.context(), path.save_id, path.version, &path.branch)
        .await?;

    Ok(Json(ApiResponse::ok(SaveResponse::with_owner(
        owned.save,
        owned.owner_name,
    ))))
}

/// POST /api/state/{save_id}
pub async fn update_state(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(save_id): Path<String>,
    ApiJson(req): ApiJson<UpdateStateRequest>,
) -> ApiResult<SaveSummary> {
    let save_id = parse_uuid(&save_id)?;
    let updated = state
        .save_service
        .update(&auth, save_id, req.into())
        .await?;
    Ok(Json(ApiResponse::ok(updated.into())))
}

/// DELETE /api/state/{save_id}/{version}/{branch}
pub async fn delete_state(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((save_id, version, branch)): Path<(String, String, String)>,
) -> ApiResult<DeleteResponse> {
    let path = SnapshotPath::parse(&save_id, &version, branch)?;
    state
        .save_service
        .delete(&auth, path.save_id, path.version, &path.branch)
        .await?;
    Ok(Json(ApiResponse::ok(DeleteResponse { done: true })))
}

/// POST /api/state/{save_id}/{version}/{branch}/share/{sharing}
pub async fn set_sharing(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((save_id, version, branch, sharing)): Path<(String, String, String, String)>,
) -> ApiResult<SaveResponse> {
    let path = SnapshotPath::parse(&save_id, &version, branch)?;
    let save = state
        .save_service
        .set_sharing(&auth, path.save_id, path.version, &path.branch, &sharing)
        .await?;
    Ok(Json(ApiResponse::ok(save.into())))
}

/// GET /api/state/mine
pub async fn list_mine(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(params): ApiQuery<MineParams>,
) -> ApiResult<Vec<SaveSummary>> {
    let saves = if params.all {
        state.save_service.list_own(&auth).await?
    } else {
        state.save_service.list_distinct_latest(&auth).await?
    };
    Ok(Json(ApiResponse::ok(summaries(saves))))
}

/// GET /api/state/arduino
pub async fn list_arduino(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Vec<SaveSummary>> {
    let saves = state.save_service.list_arduino(&auth).await?;
    Ok(Json(ApiResponse::ok(summaries(saves))))
}

/// GET /api/state/search
pub async fn search_states(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<PageResponse<SaveSummary>> {
    let (filter, page) = params.into_parts();
    let result = state.save_service.search(&auth, &filter, &page).await?;

    Ok(Json(ApiResponse::ok(PageResponse::new(
        summaries(result.items),
        result.page,
        result.page_size,
        result.total_items,
    ))))
}

/// GET /api/state/{save_id}/versions
pub async fn list_versions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(save_id): Path<String>,
) -> ApiResult<Vec<SaveSummary>> {
    let save_id = parse_uuid(&save_id)?;
    let saves = state.save_service.list_versions(&auth, save_id).await?;
    Ok(Json(ApiResponse::ok(summaries(saves))))
}

/// GET /api/state/{save_id}/{version}/{branch}/exact
pub async fn get_version(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((save_id, version, branch)): Path<(String, String, String)>,
) -> ApiResult<SaveResponse> {
    let path = SnapshotPath::parse(&save_id, &version, branch)?;
    let save = state
        .save_service
        .get_specific_version(&auth, path.save_id, path.version, &path.branch)
        .await?;
    Ok(Json(ApiResponse::ok(save.into())))
}

fn summaries(saves: Vec<esim_entity::save::StateSave>) -> Vec<SaveSummary> {
    saves.into_iter().map(SaveSummary::from).collect()
}
