//! Ticket messages and membership

use chrono::{DateTime, Utc};
use kernel::id::{TicketId, TicketMessageId, UserId};

/// Who wrote a message. Stored as a nullable author id; `NULL` is the
/// system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageAuthor {
    User(UserId),
    System,
}

impl MessageAuthor {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            MessageAuthor::User(id) => Some(*id),
            MessageAuthor::System => None,
        }
    }
}

impl From<Option<UserId>> for MessageAuthor {
    fn from(user_id: Option<UserId>) -> Self {
        user_id.map_or(MessageAuthor::System, MessageAuthor::User)
    }
}

/// A message about to be posted. The repository stamps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub author: MessageAuthor,
    pub text: String,
}

impl NewMessage {
    pub fn from_user(user_id: UserId, text: String) -> Self {
        Self {
            author: MessageAuthor::User(user_id),
            text,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            author: MessageAuthor::System,
            text: text.into(),
        }
    }

    /// `at` is never earlier than the ticket's current `last_update`, so
    /// messages of one ticket are ordered by timestamp.
    pub fn stamp(self, ticket_id: TicketId, at: DateTime<Utc>) -> TicketMessage {
        TicketMessage {
            id: TicketMessageId::new(),
            ticket_id,
            author: self.author,
            text: self.text,
            created_at: at,
        }
    }
}

/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketMessage {
    pub id: TicketMessageId,
    pub ticket_id: TicketId,
    pub author: MessageAuthor,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketMember {
    pub ticket_id: TicketId,
    pub user_id: UserId,
    pub added_at: DateTime<Utc>,
}

/// Timestamp for a message posted at `now` to a ticket last updated at
/// `last_update`. Guards against clock steps backwards.
pub fn message_timestamp(now: DateTime<Utc>, last_update: DateTime<Utc>) -> DateTime<Utc> {
    now.max(last_update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_author_from_column() {
        let user = UserId::new();
        assert_eq!(MessageAuthor::from(Some(user)), MessageAuthor::User(user));
        assert_eq!(MessageAuthor::from(None), MessageAuthor::System);
        assert_eq!(MessageAuthor::User(user).user_id(), Some(user));
    }

    #[test]
    fn test_message_timestamp_is_monotonic() {
        let now = Utc::now();
        let later = now + Duration::seconds(5);
        assert_eq!(message_timestamp(now, later), later);
        assert_eq!(message_timestamp(later, now), later);
    }

    #[test]
    fn test_system_message_has_no_user() {
        let msg = NewMessage::system("hello").stamp(TicketId::new(), Utc::now());
        assert_eq!(msg.author.user_id(), None);
    }
}
