//! Ticket access rules
//!
//! Plain users reach a ticket only as its owner or an explicit member;
//! `team` and `owner` reach every ticket.

use auth::UserRole;
use kernel::id::UserId;

use crate::domain::entity::{Ticket, TicketStatus};

/// Read and reply access.
pub fn can_access(role: UserRole, user_id: &UserId, ticket: &Ticket, is_member: bool) -> bool {
    role.is_privileged() || ticket.is_owned_by(user_id) || is_member
}

/// Only the creator or support staff may close a ticket.
pub fn can_close(role: UserRole, user_id: &UserId, ticket: &Ticket) -> bool {
    role.is_privileged() || ticket.is_owned_by(user_id)
}

/// Status after a reply by someone with `role`: support replying hands the
/// ticket back to the customer, a customer reply puts it back in the
/// support queue.
pub fn status_after_reply(role: UserRole) -> TicketStatus {
    if role.is_privileged() {
        TicketStatus::InProgress
    } else {
        TicketStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::TicketPriority;
    use chrono::Utc;

    fn ticket(owner: UserId) -> Ticket {
        Ticket::open(owner, "Login broken".into(), TicketPriority::Medium, Utc::now())
    }

    #[test]
    fn test_owner_and_members_have_access() {
        let owner = UserId::new();
        let other = UserId::new();
        let t = ticket(owner);

        assert!(can_access(UserRole::User, &owner, &t, false));
        assert!(can_access(UserRole::User, &other, &t, true));
        assert!(!can_access(UserRole::User, &other, &t, false));
    }

    #[test]
    fn test_staff_reach_every_ticket() {
        let t = ticket(UserId::new());
        let staff = UserId::new();

        assert!(can_access(UserRole::Team, &staff, &t, false));
        assert!(can_access(UserRole::Owner, &staff, &t, false));
        assert!(can_close(UserRole::Team, &staff, &t));
    }

    #[test]
    fn test_members_cannot_close() {
        let owner = UserId::new();
        let t = ticket(owner);

        assert!(can_close(UserRole::User, &owner, &t));
        assert!(!can_close(UserRole::User, &UserId::new(), &t));
    }

    #[test]
    fn test_status_after_reply() {
        assert_eq!(status_after_reply(UserRole::User), TicketStatus::Open);
        assert_eq!(status_after_reply(UserRole::Team), TicketStatus::InProgress);
        assert_eq!(status_after_reply(UserRole::Owner), TicketStatus::InProgress);
    }
}
