//! eSim component library references.

pub mod model;

pub use model::EsimLibrary;
