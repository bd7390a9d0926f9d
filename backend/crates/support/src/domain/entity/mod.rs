pub mod message;
pub mod service;
pub mod ticket;

pub use message::{MessageAuthor, NewMessage, TicketMember, TicketMessage};
pub use service::{Service, ServiceAssignment, Transaction, UserService};
pub use ticket::{Ticket, TicketPriority, TicketStatus};
