//! Domain Layer
//!
//! Contains entities, value objects, repository traits and the
//! identity-provider seam.

pub mod entity;
pub mod identity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{session::Session, user::User};
pub use repository::{AuthStore, SessionRepository, TableInventory, UserRepository};
