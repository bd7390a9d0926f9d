//! Authorization Gate
//!
//! Resolves a bearer token to a [`Principal`] and checks roles.
//!
//! | Situation                               | Result            | HTTP |
//! |-----------------------------------------|-------------------|------|
//! | no token                                | `Unauthenticated` | 401  |
//! | unknown / expired token, user deleted   | `SessionInvalid`  | 403  |
//! | valid session, role not allowed         | `Forbidden`       | 403  |

use std::sync::Arc;

use kernel::id::UserId;

use crate::application::config::AuthConfig;
use crate::application::session_manager::SessionManager;
use crate::domain::entity::user::User;
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::domain::value_object::user_role::UserRole;
use crate::error::{AuthError, AuthResult};

/// Roles that pass administrative checks.
pub const PRIVILEGED: &[UserRole] = &[UserRole::Team, UserRole::Owner];
pub const OWNER_ONLY: &[UserRole] = &[UserRole::Owner];

/// The authenticated caller, as loaded for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: UserRole,
    pub display_name: String,
    pub email: String,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            role: user.role,
            display_name: user.display_name.as_str().to_string(),
            email: user.email.as_str().to_string(),
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }
}

pub struct AuthorizationGate<R> {
    sessions: SessionManager<R>,
    users: Arc<R>,
}

impl<R> Clone for AuthorizationGate<R> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            users: self.users.clone(),
        }
    }
}

impl<R> AuthorizationGate<R>
where
    R: UserRepository + SessionRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self {
            sessions: SessionManager::new(repo.clone(), config),
            users: repo,
        }
    }

    /// The role comes from the user row, so a role change applies to
    /// sessions that already exist.
    pub async fn authenticate(&self, token: Option<&str>) -> AuthResult<Principal> {
        let token = token.ok_or(AuthError::Unauthenticated)?;
        let session = self.sessions.validate(token).await?;

        let user = self
            .users
            .find_by_id(&session.user_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        Ok(Principal::from_user(&user))
    }
}

pub fn require_role(principal: &Principal, allowed: &[UserRole]) -> AuthResult<()> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %principal.user_id,
            role = %principal.role,
            "Role check failed"
        );
        Err(AuthError::Forbidden)
    }
}
