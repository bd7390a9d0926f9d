//! Domain Layer
//!
//! Tickets, messages, memberships and the service catalog, plus the
//! access rules and repository traits.

pub mod access;
pub mod entity;
pub mod repository;

pub use entity::{Ticket, TicketMember, TicketMessage, TicketPriority, TicketStatus};
pub use repository::{
    ServiceRepository, SupportStore, TicketRepository, TicketScope,
};
