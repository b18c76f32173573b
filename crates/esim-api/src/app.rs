//! Application builder: wires router, middleware, and state into an Axum app.

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::compression::build_compression_layer;
use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    build_router(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(build_compression_layer())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use esim_core::config::AppConfig;
    use esim_database::{MemoryStore, Repositories};

    use super::*;

    fn app() -> Router {
        let repos = Repositories::memory(Arc::new(MemoryStore::new()));
        build_app(AppState::new(AppConfig::default(), repos, None))
    }

    async fn status_of(method: Method, uri: &str) -> StatusCode {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app().oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_routes_resolve() {
        assert_eq!(status_of(Method::GET, "/api/health").await, StatusCode::OK);
        assert_eq!(
            status_of(Method::GET, "/api/nowhere").await,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(Method::POST, "/api/state/mine").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            status_of(Method::GET, "/api/state/mine").await,
            StatusCode::UNAUTHORIZED
        );
    }
}
