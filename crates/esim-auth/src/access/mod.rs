//! Save-level access control.

pub mod gate;

pub use gate::{AccessGate, Capability};
