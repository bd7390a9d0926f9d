//! Update Profile Use Case
//!
//! Partial update of name, company, email and password. A password change
//! revokes every session of the user, the caller's included.

use std::sync::Arc;

use audit::{AuditEvent, AuditEventType, AuditLog, AuditSink};
use kernel::validation::optional_text;
use platform::credential::CredentialStore;
use platform::password::ClearTextPassword;
use zeroize::Zeroizing;

use crate::application::authorization::Principal;
use crate::application::register::COMPANY_MAX_CHARS;
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{display_name::DisplayName, email::Email};
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub client_ip: Option<String>,
}

struct ProfileChange {
    user: User,
    fields: Vec<&'static str>,
    revoked_sessions: u64,
}

pub struct UpdateProfileUseCase<R, A> {
    repo: Arc<R>,
    audit: AuditLog<A>,
    credentials: CredentialStore,
}

impl<R, A> UpdateProfileUseCase<R, A>
where
    R: UserRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, audit: AuditLog<A>, credentials: CredentialStore) -> Self {
        Self {
            repo,
            audit,
            credentials,
        }
    }

    pub async fn execute(
        &self,
        principal: &Principal,
        input: UpdateProfileInput,
    ) -> AuthResult<User> {
        let client_ip = input.client_ip.clone();
        let changes_password = input.password.is_some();

        match self.apply(principal, input).await {
            Ok(change) => {
                let event = if changes_password {
                    AuditEvent::new(AuditEventType::AuthPasswordChanged)
                        .meta("revokedSessions", change.revoked_sessions)
                } else {
                    AuditEvent::new(AuditEventType::AuthProfileUpdated)
                };
                self.audit
                    .record(
                        event
                            .actor(principal.user_id)
                            .client_ip(client_ip)
                            .meta("fields", change.fields),
                    )
                    .await;

                tracing::info!(user_id = %principal.user_id, changes_password, "Profile updated");
                Ok(change.user)
            }
            Err(e) => {
                if changes_password {
                    let reason = if e.is_infrastructure() {
                        "internal_error".to_string()
                    } else {
                        e.to_string()
                    };
                    self.audit
                        .record(
                            AuditEvent::new(AuditEventType::AuthPasswordChangeFailed)
                                .actor(principal.user_id)
                                .client_ip(client_ip)
                                .meta("reason", reason),
                        )
                        .await;
                }
                Err(e)
            }
        }
    }

    async fn apply(
        &self,
        principal: &Principal,
        input: UpdateProfileInput,
    ) -> AuthResult<ProfileChange> {
        let mut user = self
            .repo
            .find_by_id(&principal.user_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;
        let mut fields = Vec::new();

        if let Some(name) = input.name.as_deref() {
            user.display_name = DisplayName::new(name)?;
            fields.push("name");
        }
        if let Some(company) = input.company.as_deref() {
            // Blank clears the company.
            user.company = optional_text("Company", Some(company), COMPANY_MAX_CHARS)?;
            fields.push("company");
        }
        if let Some(email) = input.email.as_deref() {
            user.email = Email::new(email)?;
            fields.push("email");
        }

        let password = input.password.map(ClearTextPassword::new).transpose()?;
        user.touch();

        let Some(password) = password else {
            self.repo.update(&user).await?;
            return Ok(ProfileChange {
                user,
                fields,
                revoked_sessions: 0,
            });
        };

        let derived = self
            .credentials
            .derive_blocking(Zeroizing::new(password.expose().to_string()))
            .await?;
        user.credential = derived.into();
        fields.push("password");

        let revoked_sessions = self.repo.update_and_revoke_sessions(&user).await?;
        tracing::info!(
            user_id = %user.user_id,
            revoked_sessions,
            "Password changed, sessions revoked"
        );

        Ok(ProfileChange {
            user,
            fields,
            revoked_sessions,
        })
    }
}
