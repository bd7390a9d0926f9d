//! User Entity

use chrono::{DateTime, Utc};
use kernel::id::UserId;

use crate::domain::value_object::{
    display_name::DisplayName, email::Email, referral_code::ReferralCode, user_role::UserRole,
};

/// Stored password credential. Both halves are hex.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordCredential {
    pub hash: String,
    pub salt: String,
}

impl From<platform::credential::DerivedCredential> for PasswordCredential {
    fn from(derived: platform::credential::DerivedCredential) -> Self {
        Self {
            hash: derived.hash,
            salt: derived.salt,
        }
    }
}

impl std::fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordCredential([REDACTED])")
    }
}

/// User entity
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub display_name: DisplayName,
    /// Unique, lower-cased
    pub email: Email,
    pub credential: PasswordCredential,
    pub role: UserRole,
    pub company: Option<String>,
    /// Unique
    pub referral_code: ReferralCode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        display_name: DisplayName,
        email: Email,
        credential: PasswordCredential,
        role: UserRole,
        company: Option<String>,
    ) -> Self {
        let now = Utc::now();
        let referral_code = ReferralCode::generate(display_name.as_str());

        Self {
            user_id: UserId::new(),
            display_name,
            email,
            credential,
            role,
            company,
            referral_code,
            created_at: now,
            updated_at: now,
        }
    }

    /// Draw a new referral code after a collision.
    pub fn regenerate_referral_code(&mut self) {
        self.referral_code = ReferralCode::generate(self.display_name.as_str());
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
