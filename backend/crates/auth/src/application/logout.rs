//! Logout Use Case

use std::sync::Arc;

use audit::{AuditEvent, AuditEventType, AuditLog, AuditSink};

use crate::application::authorization::Principal;
use crate::application::config::AuthConfig;
use crate::application::session_manager::SessionManager;
use crate::domain::repository::SessionRepository;
use crate::error::AuthResult;

pub struct LogoutUseCase<R, A> {
    sessions: SessionManager<R>,
    audit: AuditLog<A>,
}

impl<R, A> LogoutUseCase<R, A>
where
    R: SessionRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, audit: AuditLog<A>, config: Arc<AuthConfig>) -> Self {
        Self {
            sessions: SessionManager::new(repo, config),
            audit,
        }
    }

    /// Revoke the presented token only; other devices stay signed in when
    /// multiple sessions are allowed.
    pub async fn execute(
        &self,
        principal: &Principal,
        token: &str,
        client_ip: Option<String>,
    ) -> AuthResult<()> {
        self.sessions.revoke(token).await?;

        tracing::info!(user_id = %principal.user_id, "User logged out");
        self.audit
            .record(
                AuditEvent::new(AuditEventType::AuthLogout)
                    .actor(principal.user_id)
                    .client_ip(client_ip),
            )
            .await;

        Ok(())
    }
}
