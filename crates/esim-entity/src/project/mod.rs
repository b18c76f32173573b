//! Published project entities.

pub mod model;

pub use model::Project;
