//! API DTOs (Data Transfer Objects)

use auth::UserRole;
use chrono::{DateTime, Utc};
use kernel::id::{TicketId, TicketMessageId, TransactionId, UserId, UserServiceId};
use serde::{Deserialize, Serialize};

use crate::application::views::{MemberView, MessageView, Profile, TicketView};
use crate::domain::entity::{ServiceAssignment, Ticket, TicketMember, TicketPriority, TicketStatus};

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    #[serde(default)]
    pub subject: String,
    pub priority: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignServiceRequest {
    pub service_id: i64,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketResponse {
    pub id: TicketId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub company: Option<String>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.user_id,
            name: profile.name,
            email: profile.email,
            role: profile.role,
            company: profile.company,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub id: TicketId,
    pub owner_id: UserId,
    pub subject: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<ProfileResponse>,
}

impl TicketResponse {
    fn new(ticket: Ticket, creator: Option<Profile>) -> Self {
        Self {
            id: ticket.id,
            owner_id: ticket.owner_id,
            subject: ticket.subject,
            status: ticket.status,
            priority: ticket.priority,
            created_at: ticket.created_at,
            last_update: ticket.last_update,
            creator: creator.map(ProfileResponse::from),
        }
    }
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self::new(ticket, None)
    }
}

impl From<TicketView> for TicketResponse {
    fn from(view: TicketView) -> Self {
        Self::new(view.ticket, view.creator)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketsResponse {
    pub tickets: Vec<TicketResponse>,
}

/// `authorId`, `authorName` and `authorRole` are null for system messages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: TicketMessageId,
    pub ticket_id: TicketId,
    pub author_id: Option<UserId>,
    pub author_name: Option<String>,
    pub author_role: Option<UserRole>,
    pub system: bool,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<MessageView> for MessageResponse {
    fn from(view: MessageView) -> Self {
        let MessageView { message, author } = view;
        let author_id = message.author.user_id();
        let (author_name, author_role) = match author {
            Some(profile) => (Some(profile.name), Some(profile.role)),
            None => (None, None),
        };

        Self {
            id: message.id,
            ticket_id: message.ticket_id,
            author_id,
            author_name,
            author_role,
            system: author_id.is_none(),
            text: message.text,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub user_id: UserId,
    pub added_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileResponse>,
}

impl From<TicketMember> for MemberResponse {
    fn from(member: TicketMember) -> Self {
        Self {
            user_id: member.user_id,
            added_at: member.added_at,
            profile: None,
        }
    }
}

impl From<MemberView> for MemberResponse {
    fn from(view: MemberView) -> Self {
        Self {
            profile: view.profile.map(ProfileResponse::from),
            ..Self::from(view.member)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersResponse {
    pub members: Vec<MemberResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignServiceResponse {
    pub user_service_id: UserServiceId,
    pub transaction_id: TransactionId,
    pub amount_cents: i64,
    pub due_at: DateTime<Utc>,
}

impl From<ServiceAssignment> for AssignServiceResponse {
    fn from(assignment: ServiceAssignment) -> Self {
        Self {
            user_service_id: assignment.user_service.id,
            transaction_id: assignment.transaction.id,
            amount_cents: assignment.transaction.amount_cents,
            due_at: assignment.transaction.due_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::NewMessage;

    #[test]
    fn test_system_message_has_no_author_fields() {
        let message = NewMessage::system("closed").stamp(TicketId::new(), Utc::now());
        let json = serde_json::to_value(MessageResponse::from(MessageView {
            message,
            author: None,
        }))
        .unwrap();

        assert_eq!(json["system"], true);
        assert!(json["authorId"].is_null());
        assert!(json["authorName"].is_null());
    }

    #[test]
    fn test_ticket_status_wire_names() {
        let ticket = Ticket::open(UserId::new(), "Help".into(), TicketPriority::High, Utc::now());
        let json = serde_json::to_value(TicketResponse::from(ticket)).unwrap();

        assert_eq!(json["status"], "Open");
        assert_eq!(json["priority"], "High");
        assert!(json.get("creator").is_none());
    }
}
