//! Session Manager
//!
//! Issues, validates and revokes opaque bearer sessions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::UserId;

use crate::application::config::AuthConfig;
use crate::domain::entity::session::{IssuedSession, Session, hash_token};
use crate::domain::repository::SessionRepository;
use crate::error::{AuthError, AuthResult};

pub struct SessionManager<R> {
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> Clone for SessionManager<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R> SessionManager<R>
where
    R: SessionRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn issue(&self, user_id: UserId) -> AuthResult<IssuedSession> {
        self.issue_at(user_id, Utc::now()).await
    }

    /// Under the single-active-session policy, the user's other sessions are
    /// revoked in the same unit as the insert.
    pub async fn issue_at(&self, user_id: UserId, now: DateTime<Utc>) -> AuthResult<IssuedSession> {
        let issued = IssuedSession::generate(user_id, now, self.config.session_ttl_chrono());

        let revoked = self
            .repo
            .replace_for_user(&issued.session, self.config.single_active_session)
            .await?;

        tracing::info!(
            user_id = %user_id,
            revoked_sessions = revoked,
            expires_at = %issued.session.expires_at,
            "Session issued"
        );

        Ok(issued)
    }

    pub async fn validate(&self, token: &str) -> AuthResult<Session> {
        self.validate_at(token, Utc::now()).await
    }

    /// `SessionInvalid` for an unknown or expired token; an expired row is
    /// deleted on the way out. Store errors propagate unchanged.
    pub async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Session> {
        let token_hash = hash_token(token);

        let session = self
            .repo
            .find(&token_hash)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if session.is_expired_at(now) {
            self.repo.delete(&token_hash).await?;
            tracing::debug!(user_id = %session.user_id, "Expired session removed");
            return Err(AuthError::SessionInvalid);
        }

        Ok(session)
    }

    pub async fn revoke(&self, token: &str) -> AuthResult<bool> {
        self.repo.delete(&hash_token(token)).await
    }

    pub async fn revoke_all(&self, user_id: &UserId) -> AuthResult<u64> {
        let revoked = self.repo.delete_all_for_user(user_id).await?;
        tracing::info!(user_id = %user_id, revoked_sessions = revoked, "Sessions revoked");
        Ok(revoked)
    }
}
