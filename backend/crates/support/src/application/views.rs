//! Read models
//!
//! Tickets, messages and members joined with the public profile of the
//! user they refer to.

use auth::UserRole;
use auth::domain::User;
use kernel::id::UserId;

use crate::domain::entity::{Ticket, TicketMember, TicketMessage};

/// Public part of a user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub company: Option<String>,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.display_name.as_str().to_string(),
            email: user.email.as_str().to_string(),
            role: user.role,
            company: user.company.clone(),
        }
    }
}

/// A ticket with its creator. The creator is `None` once the account is gone.
#[derive(Debug, Clone)]
pub struct TicketView {
    pub ticket: Ticket,
    pub creator: Option<Profile>,
}

/// `author` is `None` for system messages.
#[derive(Debug, Clone)]
pub struct MessageView {
    pub message: TicketMessage,
    pub author: Option<Profile>,
}

#[derive(Debug, Clone)]
pub struct MemberView {
    pub member: TicketMember,
    pub profile: Option<Profile>,
}
