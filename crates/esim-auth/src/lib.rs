//! # esim-auth
//!
//! Identity and authorization for the eSim state save service.
//!
//! ## Modules
//!
//! - `jwt`: HS256 bearer token encoding, validation, and claims
//! - `access`: the access gate deciding read, modify, and delete rights on saves

pub mod access;
pub mod jwt;

pub use access::{AccessGate, Capability};
pub use jwt::{Claims, JwtDecoder, JwtEncoder};
