//! Login Use Case
//!
//! Email + password sign-in. Unknown email and wrong password produce the
//! same error and cost one key derivation each.

use std::sync::Arc;

use audit::{AuditEvent, AuditEventType, AuditLog, AuditSink};
use platform::credential::CredentialStore;
use platform::password::normalize_submitted;

use crate::application::config::AuthConfig;
use crate::application::register::AuthOutput;
use crate::application::session_manager::SessionManager;
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub client_ip: Option<String>,
}

pub struct LoginUseCase<R, A> {
    repo: Arc<R>,
    audit: AuditLog<A>,
    credentials: CredentialStore,
    config: Arc<AuthConfig>,
}

impl<R, A> LoginUseCase<R, A>
where
    R: UserRepository + SessionRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    pub fn new(
        repo: Arc<R>,
        audit: AuditLog<A>,
        credentials: CredentialStore,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            repo,
            audit,
            credentials,
            config,
        }
    }

    pub async fn execute(&self, input: LoginInput) -> AuthResult<AuthOutput> {
        if input.email.trim().is_empty() || input.password.is_empty() {
            let err = AuthError::Validation("Email and password are required".to_string());
            return Err(self.reject(err, input.client_ip).await);
        }

        let password = normalize_submitted(&input.password);
        let user = match Email::new(&input.email) {
            Ok(email) => self.repo.find_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(user) = user else {
            // Same work as a real verification so response time does not
            // reveal whether the address is registered.
            self.credentials.derive_blocking(password).await?;
            self.audit
                .record(
                    AuditEvent::new(AuditEventType::AuthLoginFailed)
                        .client_ip(input.client_ip)
                        .meta("reason", "unknown_email"),
                )
                .await;
            return Err(AuthError::InvalidCredentials);
        };

        let verified = self
            .credentials
            .verify_blocking(
                password,
                user.credential.hash.clone(),
                user.credential.salt.clone(),
            )
            .await?;

        if !verified {
            self.audit
                .record(
                    AuditEvent::new(AuditEventType::AuthLoginFailed)
                        .actor(user.user_id)
                        .client_ip(input.client_ip)
                        .meta("reason", "bad_password"),
                )
                .await;
            return Err(AuthError::InvalidCredentials);
        }

        let issued = SessionManager::new(self.repo.clone(), self.config.clone())
            .issue(user.user_id)
            .await?;

        tracing::info!(user_id = %user.user_id, "User logged in");
        self.audit
            .record(
                AuditEvent::new(AuditEventType::AuthLoginSuccess)
                    .actor(user.user_id)
                    .client_ip(input.client_ip),
            )
            .await;

        Ok(AuthOutput {
            token: issued.token,
            user,
        })
    }

    /// Audit a login attempt rejected before any credential check and hand
    /// the error back.
    pub async fn reject(&self, err: AuthError, client_ip: Option<String>) -> AuthError {
        self.audit
            .record(
                AuditEvent::new(AuditEventType::AuthLoginFailed)
                    .client_ip(client_ip)
                    .meta("reason", err.to_string()),
            )
            .await;
        err
    }
}
