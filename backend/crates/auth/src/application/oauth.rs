//! OAuth Sign-In Use Case
//!
//! Exchanges a provider authorization code for an identity, then finds or
//! creates the matching account and signs it in. Accounts created here get
//! a random password the user never sees.

use std::sync::Arc;

use audit::{AuditEvent, AuditEventType, AuditLog, AuditSink};
use platform::credential::CredentialStore;
use platform::crypto::random_token;
use zeroize::Zeroizing;

use crate::application::config::AuthConfig;
use crate::application::register::AuthOutput;
use crate::application::session_manager::SessionManager;
use crate::domain::entity::user::User;
use crate::domain::identity::{IdentityProviders, provider_company};
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::domain::value_object::{display_name::DisplayName, email::Email, user_role::UserRole};
use crate::error::{AuthError, AuthResult};

pub struct OAuthSignInInput {
    pub provider: String,
    pub code: String,
    pub client_ip: Option<String>,
}

pub struct OAuthSignInUseCase<R, A> {
    repo: Arc<R>,
    audit: AuditLog<A>,
    credentials: CredentialStore,
    providers: Arc<IdentityProviders>,
    config: Arc<AuthConfig>,
}

impl<R, A> OAuthSignInUseCase<R, A>
where
    R: UserRepository + SessionRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    pub fn new(
        repo: Arc<R>,
        audit: AuditLog<A>,
        credentials: CredentialStore,
        providers: Arc<IdentityProviders>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            repo,
            audit,
            credentials,
            providers,
            config,
        }
    }

    pub async fn execute(&self, input: OAuthSignInInput) -> AuthResult<AuthOutput> {
        let provider = self
            .providers
            .get(&input.provider)
            .ok_or(AuthError::UnknownProvider)?;

        if input.code.trim().is_empty() {
            return Err(AuthError::Validation(
                "Authorization code is required".to_string(),
            ));
        }

        let identity = provider.exchange(input.code.trim()).await?;
        let email = Email::new(&identity.email)?;

        let (user, created) = match self.repo.find_by_email(&email).await? {
            Some(user) => (user, false),
            None => (self.create_user(&input.provider, &identity.display_name, email).await?, true),
        };

        let issued = SessionManager::new(self.repo.clone(), self.config.clone())
            .issue(user.user_id)
            .await?;

        tracing::info!(
            user_id = %user.user_id,
            provider = %input.provider,
            created,
            "OAuth sign-in"
        );
        self.audit
            .record(
                AuditEvent::new(AuditEventType::AuthOauthLogin)
                    .actor(user.user_id)
                    .client_ip(input.client_ip)
                    .meta("provider", input.provider.as_str())
                    .meta("created", created),
            )
            .await;

        Ok(AuthOutput {
            token: issued.token,
            user,
        })
    }

    async fn create_user(&self, provider: &str, name: &str, email: Email) -> AuthResult<User> {
        let name = DisplayName::new(name).or_else(|_| DisplayName::new(email.as_str()))?;

        let password = Zeroizing::new(random_token(32));
        let derived = self.credentials.derive_blocking(password).await?;

        let role = if self.config.is_bootstrap_owner(&email) {
            UserRole::Owner
        } else {
            UserRole::User
        };
        let mut user = User::new(name, email, derived.into(), role, Some(provider_company(provider)));

        // A concurrent sign-in may have created the account first.
        for _ in 0..5 {
            match self.repo.create(&user).await {
                Ok(()) => return Ok(user),
                Err(AuthError::ReferralCodeTaken) => user.regenerate_referral_code(),
                Err(AuthError::UserAlreadyExists) => {
                    return self
                        .repo
                        .find_by_email(&user.email)
                        .await?
                        .ok_or(AuthError::UserAlreadyExists);
                }
                Err(e) => return Err(e),
            }
        }
        Err(AuthError::Internal(
            "Could not allocate a unique referral code".to_string(),
        ))
    }
}
