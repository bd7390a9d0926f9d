//! Application Layer
//!
//! Use cases and application services.

pub mod admin;
pub mod authorization;
pub mod config;
pub mod login;
pub mod logout;
pub mod oauth;
pub mod register;
pub mod session_manager;
pub mod update_profile;

// Re-exports
pub use admin::AdminUseCase;
pub use authorization::{AuthorizationGate, OWNER_ONLY, PRIVILEGED, Principal, require_role};
pub use config::AuthConfig;
pub use login::{LoginInput, LoginUseCase};
pub use logout::LogoutUseCase;
pub use oauth::{OAuthSignInInput, OAuthSignInUseCase};
pub use register::{AuthOutput, RegisterInput, RegisterUseCase};
pub use session_manager::SessionManager;
pub use update_profile::{UpdateProfileInput, UpdateProfileUseCase};
