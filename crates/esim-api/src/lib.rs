//! # esim-api
//!
//! HTTP API layer for the eSim state save service built on Axum.
//!
//! Provides the `/api/state` endpoints, health check, middleware (CORS,
//! logging, compression, timeouts), extractors, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use state::AppState;
