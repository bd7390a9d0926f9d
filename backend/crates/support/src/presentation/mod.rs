//! Presentation Layer
//!
//! HTTP handlers, DTOs and router. Authentication is the auth crate's
//! `require_principal` layer.

pub mod dto;
pub mod handlers;
pub mod router;

pub use handlers::SupportAppState;
pub use router::{support_admin_router, support_router};
