//! Register Use Case
//!
//! Creates a `user`-role account and signs it in.

use std::sync::Arc;

use audit::{AuditEvent, AuditEventType, AuditLog, AuditSink};
use kernel::validation::optional_text;
use platform::credential::CredentialStore;
use platform::password::ClearTextPassword;
use zeroize::Zeroizing;

use crate::application::config::AuthConfig;
use crate::application::session_manager::SessionManager;
use crate::domain::entity::user::User;
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::domain::value_object::{
    display_name::DisplayName, email::Email, user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

pub const COMPANY_MAX_CHARS: usize = 100;

/// Referral codes are drawn from 9000 numbers per prefix; a handful of
/// retries is plenty.
const MAX_REFERRAL_ATTEMPTS: usize = 5;

pub struct RegisterInput {
    pub name: String,
    pub company: Option<String>,
    pub email: String,
    pub password: String,
    pub client_ip: Option<String>,
}

/// Signed-in user with a fresh bearer token.
#[derive(Debug)]
pub struct AuthOutput {
    pub token: String,
    pub user: User,
}

pub struct RegisterUseCase<R, A> {
    repo: Arc<R>,
    audit: AuditLog<A>,
    credentials: CredentialStore,
    config: Arc<AuthConfig>,
}

impl<R, A> RegisterUseCase<R, A>
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

    pub async fn execute(&self, input: RegisterInput) -> AuthResult<AuthOutput> {
        let client_ip = input.client_ip.clone();
        let attempted_email = Email::new(&input.email).ok();

        match self.register(input).await {
            Ok(output) => {
                tracing::info!(user_id = %output.user.user_id, "User registered");
                self.audit
                    .record(
                        AuditEvent::new(AuditEventType::AuthRegisterSuccess)
                            .actor(output.user.user_id)
                            .client_ip(client_ip)
                            .meta("email", output.user.email.as_str())
                            .meta("role", output.user.role.code()),
                    )
                    .await;
                Ok(output)
            }
            Err(e) => {
                self.record_failure(&e, client_ip, attempted_email).await;
                Err(e)
            }
        }
    }

    /// Audit a registration whose request never produced an input, such as
    /// an unreadable body, and hand the error back.
    pub async fn reject(&self, err: AuthError, client_ip: Option<String>) -> AuthError {
        self.record_failure(&err, client_ip, None).await;
        err
    }

    async fn record_failure(
        &self,
        err: &AuthError,
        client_ip: Option<String>,
        attempted_email: Option<Email>,
    ) {
        let reason = if err.is_infrastructure() {
            "internal_error".to_string()
        } else {
            err.to_string()
        };
        let mut event = AuditEvent::new(AuditEventType::AuthRegisterFailed)
            .client_ip(client_ip)
            .meta("reason", reason);
        if let Some(email) = attempted_email {
            event = event.meta("email", email.as_str());
        }
        self.audit.record(event).await;
    }

    async fn register(&self, input: RegisterInput) -> AuthResult<AuthOutput> {
        let name = DisplayName::new(&input.name)?;
        let company = optional_text("Company", input.company.as_deref(), COMPANY_MAX_CHARS)?;
        let email = Email::new(&input.email)?;
        let password = ClearTextPassword::new(input.password)?;

        let derived = self
            .credentials
            .derive_blocking(Zeroizing::new(password.expose().to_string()))
            .await?;

        let role = if self.config.is_bootstrap_owner(&email) {
            UserRole::Owner
        } else {
            UserRole::User
        };

        let mut user = User::new(name, email, derived.into(), role, company);
        self.insert_with_unique_referral(&mut user).await?;

        let issued = SessionManager::new(self.repo.clone(), self.config.clone())
            .issue(user.user_id)
            .await?;

        Ok(AuthOutput {
            token: issued.token,
            user,
        })
    }

    async fn insert_with_unique_referral(&self, user: &mut User) -> AuthResult<()> {
        let mut attempt = 1;
        loop {
            match self.repo.create(user).await {
                Ok(()) => return Ok(()),
                Err(AuthError::ReferralCodeTaken) if attempt < MAX_REFERRAL_ATTEMPTS => {
                    tracing::debug!(attempt, "Referral code collision, regenerating");
                    user.regenerate_referral_code();
                    attempt += 1;
                }
                Err(AuthError::ReferralCodeTaken) => {
                    return Err(AuthError::Internal(
                        "Could not allocate a unique referral code".to_string(),
                    ));
                }
                Err(e) => return Err(e),
            }
        }
    }
}
