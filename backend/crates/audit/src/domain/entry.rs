//! Audit entries and event types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use kernel::id::{Id, UserId};
use serde::Serialize;
use serde_json::{Map, Value};

pub enum AuditEntryMarker {}
pub type AuditEntryId = Id<AuditEntryMarker>;

/// Security-relevant event kinds.
///
/// The wire/storage form is the SCREAMING_SNAKE name (`AUTH_LOGIN_FAILED`),
/// which is what consumers filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    AuthRegisterSuccess,
    AuthRegisterFailed,
    AuthLoginSuccess,
    AuthLoginFailed,
    AuthLogout,
    AuthOauthLogin,
    AuthPasswordChanged,
    AuthPasswordChangeFailed,
    AuthProfileUpdated,
    AdminRoleChanged,
    TicketCreated,
    TicketReply,
    TicketMemberAdded,
    TicketClosed,
    TicketServiceAssigned,
    InfrastructureFailure,
}

impl AuditEventType {
    pub const ALL: [AuditEventType; 16] = [
        Self::AuthRegisterSuccess,
        Self::AuthRegisterFailed,
        Self::AuthLoginSuccess,
        Self::AuthLoginFailed,
        Self::AuthLogout,
        Self::AuthOauthLogin,
        Self::AuthPasswordChanged,
        Self::AuthPasswordChangeFailed,
        Self::AuthProfileUpdated,
        Self::AdminRoleChanged,
        Self::TicketCreated,
        Self::TicketReply,
        Self::TicketMemberAdded,
        Self::TicketClosed,
        Self::TicketServiceAssigned,
        Self::InfrastructureFailure,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AuthRegisterSuccess => "AUTH_REGISTER_SUCCESS",
            Self::AuthRegisterFailed => "AUTH_REGISTER_FAILED",
            Self::AuthLoginSuccess => "AUTH_LOGIN_SUCCESS",
            Self::AuthLoginFailed => "AUTH_LOGIN_FAILED",
            Self::AuthLogout => "AUTH_LOGOUT",
            Self::AuthOauthLogin => "AUTH_OAUTH_LOGIN",
            Self::AuthPasswordChanged => "AUTH_PASSWORD_CHANGED",
            Self::AuthPasswordChangeFailed => "AUTH_PASSWORD_CHANGE_FAILED",
            Self::AuthProfileUpdated => "AUTH_PROFILE_UPDATED",
            Self::AdminRoleChanged => "ADMIN_ROLE_CHANGED",
            Self::TicketCreated => "TICKET_CREATED",
            Self::TicketReply => "TICKET_REPLY",
            Self::TicketMemberAdded => "TICKET_MEMBER_ADDED",
            Self::TicketClosed => "TICKET_CLOSED",
            Self::TicketServiceAssigned => "TICKET_SERVICE_ASSIGNED",
            Self::InfrastructureFailure => "INFRASTRUCTURE_FAILURE",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType(pub String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown audit event type: {}", self.0)
    }
}

impl std::error::Error for UnknownEventType {}

impl FromStr for AuditEventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

/// An event as reported by a caller, before it is stamped and stored.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub actor: Option<UserId>,
    pub client_ip: Option<String>,
    pub metadata: Map<String, Value>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_type,
            actor: None,
            client_ip: None,
            metadata: Map::new(),
        }
    }

    pub fn actor(mut self, user_id: UserId) -> Self {
        self.actor = Some(user_id);
        self
    }

    pub fn client_ip(mut self, ip: Option<String>) -> Self {
        self.client_ip = ip;
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Stored audit record. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub event_type: AuditEventType,
    pub actor_id: Option<UserId>,
    pub client_ip: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn from_event(event: AuditEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: AuditEntryId::new(),
            event_type: event.event_type,
            actor_id: event.actor,
            client_ip: event.client_ip,
            metadata: Value::Object(event.metadata),
            created_at: now,
        }
    }
}

/// Listing filter; newest entries first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditQuery {
    pub event_type: Option<AuditEventType>,
    pub limit: u32,
}

impl AuditQuery {
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(event_type: Option<AuditEventType>, limit: Option<u32>) -> Self {
        Self {
            event_type,
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self::new(None, None)
    }
}
