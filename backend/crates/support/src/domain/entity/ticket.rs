//! Ticket Entity

use chrono::{DateTime, Utc};
use kernel::id::{TicketId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticket lifecycle.
///
/// `Open` means the customer is waiting on support, `InProgress` that
/// support is waiting on the customer. `Closed` ends the normal flow; a
/// later reply reopens the ticket unless replies on closed tickets are
/// disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 3] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Closed,
    ];

    /// Storage code
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Closed => "closed",
        }
    }

    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    #[inline]
    pub const fn is_closed(&self) -> bool {
        matches!(self, TicketStatus::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketPriority {
    Low,
    Medium,
    High,
}

impl TicketPriority {
    pub const ALL: [TicketPriority; 3] = [
        TicketPriority::Low,
        TicketPriority::Medium,
        TicketPriority::High,
    ];

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
        }
    }

    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }

    /// Case-insensitive parse of request input (`"High"`, `"high"`).
    pub fn parse(input: &str) -> Option<Self> {
        Self::from_code(&input.trim().to_ascii_lowercase())
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Support ticket.
///
/// `status` and `last_update` only move through the repository's
/// message-posting operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: TicketId,
    /// Creator; always an implicit member
    pub owner_id: UserId,
    pub subject: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl Ticket {
    pub fn open(
        owner_id: UserId,
        subject: String,
        priority: TicketPriority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TicketId::new(),
            owner_id,
            subject,
            status: TicketStatus::Open,
            priority,
            created_at: now,
            last_update: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}
