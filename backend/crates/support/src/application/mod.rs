//! Application Layer

pub mod config;
pub mod ticket_workflow;
pub mod views;

pub use config::SupportConfig;
pub use ticket_workflow::{CreateTicketInput, TicketWorkflow, parse_ticket_id};
pub use views::{MemberView, MessageView, Profile, TicketView};
