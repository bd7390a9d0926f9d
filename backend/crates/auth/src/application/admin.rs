//! Administrative Use Cases
//!
//! `team` and `owner` may list users; only `owner` may change roles and
//! read raw table counts or the audit trail.

use std::sync::Arc;

use audit::{AuditEvent, AuditEventType, AuditLog, AuditLogEntry, AuditQuery, AuditSink};
use kernel::id::UserId;

use crate::application::authorization::{OWNER_ONLY, PRIVILEGED, Principal, require_role};
use crate::domain::entity::user::User;
use crate::domain::repository::{TableCount, TableInventory, UserRepository};
use crate::domain::value_object::user_role::UserRole;
use crate::error::{AuthError, AuthResult};

pub struct AdminUseCase<R, A> {
    repo: Arc<R>,
    audit: AuditLog<A>,
}

impl<R, A> AdminUseCase<R, A>
where
    R: UserRepository + TableInventory + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, audit: AuditLog<A>) -> Self {
        Self { repo, audit }
    }

    pub async fn list_users(&self, principal: &Principal) -> AuthResult<Vec<User>> {
        require_role(principal, PRIVILEGED)?;
        self.repo.list().await
    }

    pub async fn set_role(
        &self,
        principal: &Principal,
        target: &str,
        role: &str,
        client_ip: Option<String>,
    ) -> AuthResult<User> {
        require_role(principal, OWNER_ONLY)?;

        let target: UserId = target
            .parse()
            .map_err(|_| AuthError::Validation("Invalid user id".to_string()))?;
        let role = UserRole::from_code(role.trim())
            .ok_or_else(|| AuthError::Validation("Invalid role".to_string()))?;

        let mut user = self
            .repo
            .find_by_id(&target)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let previous = user.role;

        if !self.repo.set_role(&target, role).await? {
            return Err(AuthError::UserNotFound);
        }
        user.role = role;

        tracing::info!(
            actor_id = %principal.user_id,
            target_id = %target,
            from = %previous,
            to = %role,
            "User role changed"
        );
        self.audit
            .record(
                AuditEvent::new(AuditEventType::AdminRoleChanged)
                    .actor(principal.user_id)
                    .client_ip(client_ip)
                    .meta("targetUserId", target.to_string())
                    .meta("previousRole", previous.code())
                    .meta("role", role.code()),
            )
            .await;

        Ok(user)
    }

    pub async fn table_counts(&self, principal: &Principal) -> AuthResult<Vec<TableCount>> {
        require_role(principal, OWNER_ONLY)?;
        self.repo.table_counts().await
    }

    pub async fn audit_entries(
        &self,
        principal: &Principal,
        event_type: Option<&str>,
        limit: Option<u32>,
    ) -> AuthResult<Vec<AuditLogEntry>> {
        require_role(principal, OWNER_ONLY)?;

        let event_type = event_type
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<AuditEventType>()
                    .map_err(|_| AuthError::Validation(format!("Unknown event type: {s}")))
            })
            .transpose()?;

        Ok(self.audit.recent(&AuditQuery::new(event_type, limit)).await?)
    }
}
