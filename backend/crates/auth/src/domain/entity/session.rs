//! Session Entity
//!
//! Only the SHA-256 of the bearer token is stored; the token itself is
//! handed to the client once and never persisted.

use chrono::{DateTime, Duration, Utc};
use kernel::id::UserId;
use platform::crypto::{random_token, sha256_hex};

/// Random bytes in a session token (43 URL-safe base64 characters).
pub const SESSION_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Hex SHA-256 of the bearer token
    pub token_hash: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Invalid from `expires_at` onwards, inclusive.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A freshly issued session together with its bearer token.
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

impl IssuedSession {
    pub fn generate(user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        let token = random_token(SESSION_TOKEN_BYTES);
        let session = Session {
            token_hash: hash_token(&token),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        };
        Self { token, session }
    }
}

impl std::fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedSession")
            .field("token", &"[REDACTED]")
            .field("session", &self.session)
            .finish()
    }
}

pub fn hash_token(token: &str) -> String {
    sha256_hex(token.as_bytes())
}
