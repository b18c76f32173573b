//! # esim-entity
//!
//! Domain entity models for the eSim state save service. Every struct in
//! this crate represents a database table row or a domain value object.
//! Database entities additionally derive `sqlx::FromRow`.

pub mod library;
pub mod permission;
pub mod project;
pub mod save;
pub mod user;
