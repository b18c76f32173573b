//! Saved project state entities.

pub mod filter;
pub mod model;
pub mod sharing;
pub mod summary;

pub use filter::SaveFilter;
pub use model::{COPY_PREFIX, NewStateSave, StateSave, content_digest};
pub use sharing::SharingState;
pub use summary::SaveSummary;
