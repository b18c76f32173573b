//! Route definitions for the eSim state save API.
//!
//! All routes are mounted under `/api`. Path segments holding identifiers
//! are taken as strings and parsed in the handlers so malformed values map
//! to the API's own error codes.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the API router and thread `AppState` through every route.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.storage.max_body_bytes;

    let api_routes = Router::new()
        .merge(state_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

/// Save endpoints: create, fetch, update, delete, copy, share, listings.
fn state_routes() -> Router<AppState> {
    use handlers::state;

    Router::new()
        .route("/state", post(state::create_state))
        .route("/state/mine", get(state::list_mine))
        .route("/state/arduino", get(state::list_arduino))
        .route("/state/search", get(state::search_states))
        .route("/state/{save_id}", post(state::update_state))
        .route("/state/{save_id}/copy", post(state::copy_state))
        .route("/state/{save_id}/versions", get(state::list_versions))
        .route(
            "/state/{save_id}/{version}/{branch}",
            get(state::fetch_state).delete(state::delete_state),
        )
        .route(
            "/state/{save_id}/{version}/{branch}/exact",
            get(state::get_version),
        )
        .route(
            "/state/{save_id}/{version}/{branch}/share/{sharing}",
            post(state::set_sharing),
        )
}

/// Liveness and database reachability.
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
