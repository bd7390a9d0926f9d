//! Support (Ticket Desk) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Tickets, messages, members, service catalog, access rules
//! - `application/` - The ticket workflow and its read models
//! - `infra/` - PostgreSQL and in-memory repositories
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Workflow
//! - Any signed-in user opens tickets and becomes their first member
//! - Owners, members and staff (`team`, `owner`) read and reply
//! - A staff reply moves the ticket to `InProgress`, a user reply to `Open`
//! - Invites, closing and service bookings leave a system message
//!
//! Authentication is delegated to the auth crate's session middleware.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


// Re-exports for convenience
pub use application::{SupportConfig, TicketWorkflow};
pub use domain::repository::SupportStore;
pub use error::{SupportError, SupportResult};
pub use infra::{memory::MemorySupportRepository, postgres::PgSupportRepository};
pub use presentation::{SupportAppState, support_admin_router, support_router};
