//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Business logic, entities, repository traits
//! - `application/` - Use cases and application services
//! - `infra/` - Database implementations
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Registration and email + password login
//! - OAuth sign-in through registered identity providers
//! - Opaque bearer sessions (24h, single active session per user)
//! - Flat roles (`user`, `team`, `owner`) checked by the authorization gate
//! - Owner administration: role changes, table counts, audit trail
//!
//! ## Security Model
//! - Passwords derived with PBKDF2-HMAC-SHA512 (random salt, 100k+ iterations)
//! - Only the SHA-256 of a session token is stored
//! - Password change revokes every session of the user
//! - Sign-in routes sit behind the `auth` rate-limit policy

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::authorization::{AuthorizationGate, Principal, require_role};
pub use application::config::AuthConfig;
pub use domain::identity::{ExternalIdentity, IdentityProvider, IdentityProviders};
pub use domain::repository::AuthStore;
pub use domain::value_object::user_role::UserRole;
pub use error::{AuthError, AuthResult};
pub use infra::{memory::MemoryAuthRepository, postgres::PgAuthRepository};
pub use presentation::router::{admin_router, auth_router};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
