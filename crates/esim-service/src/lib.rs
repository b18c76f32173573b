//! # esim-service
//!
//! Business logic for the state save service. [`SaveService`] implements
//! every save use case over the repository traits, consulting the
//! [`esim_auth::AccessGate`] before touching a row.
//!
//! Services follow constructor injection; all dependencies are provided at
//! construction time.

pub mod context;
pub mod save;
pub mod thumbnail;

pub use context::RequestContext;
pub use save::{CreateSaveInput, OwnedSave, SaveService, UpdateSaveInput};
pub use thumbnail::{Thumbnail, ThumbnailStore};
