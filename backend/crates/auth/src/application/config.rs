//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::time::Duration;

use platform::credential::CredentialConfig;

use crate::domain::value_object::email::Email;

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Lifetime of a bearer session (24 hours)
    pub session_ttl: Duration,
    /// Issuing a session revokes the user's other sessions
    pub single_active_session: bool,
    /// Key-derivation parameters for password credentials
    pub credential: CredentialConfig,
    /// Lower-cased addresses that register with the owner role
    pub owner_emails: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(24 * 3600),
            single_active_session: true,
            credential: CredentialConfig::default(),
            owner_emails: Vec::new(),
        }
    }
}

impl AuthConfig {
    pub fn with_owner_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.owner_emails = emails
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn is_bootstrap_owner(&self, email: &Email) -> bool {
        self.owner_emails.iter().any(|e| e == email.as_str())
    }

    pub fn session_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.session_ttl).unwrap_or(chrono::Duration::hours(24))
    }
}
