//! Password policy
//!
//! A [`ClearTextPassword`] can only be built from input that satisfies the
//! account password policy:
//! - 12 to 128 code points after NFKC normalization
//! - at least one lowercase letter, one uppercase letter and one digit
//! - no control characters
//! - not a well-known or trivially predictable password
//!
//! The value is zeroized on drop and never printed.

use std::fmt;

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

pub const MIN_PASSWORD_LENGTH: usize = 12;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Password policy violations. Messages are safe to show to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters")]
    TooShort { min: usize },

    #[error("Password must be at most {max} characters")]
    TooLong { max: usize },

    #[error("Password must contain a lowercase letter, an uppercase letter and a digit")]
    MissingCharacterClass,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    #[error("Password is too common or follows a predictable pattern")]
    CommonPattern,
}

/// Policy-checked clear text password.
///
/// Does not implement `Clone`; hand it to the credential store by value.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let mut raw = raw;
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();

        let char_count = normalized.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
            });
        }
        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
            });
        }

        if normalized.chars().any(char::is_control) {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        let has_lower = normalized.chars().any(char::is_lowercase);
        let has_upper = normalized.chars().any(char::is_uppercase);
        let has_digit = normalized.chars().any(|c| c.is_ascii_digit());
        if !(has_lower && has_upper && has_digit) {
            return Err(PasswordPolicyError::MissingCharacterClass);
        }

        if is_common_pattern(&normalized) {
            return Err(PasswordPolicyError::CommonPattern);
        }

        Ok(Self(normalized))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

/// NFKC form of a submitted password, without the policy checks.
///
/// Used on sign-in so that credentials stored under an older policy still
/// verify, while matching the normalization applied at registration.
pub fn normalize_submitted(raw: &str) -> Zeroizing<String> {
    Zeroizing::new(raw.nfkc().collect())
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

fn is_common_pattern(password: &str) -> bool {
    let lower = password.to_lowercase();

    let mut chars = lower.chars();
    if let Some(first) = chars.next() {
        if chars.all(|c| c == first) {
            return true;
        }
    }

    if is_sequential_numbers(&lower) {
        return true;
    }

    const KEYBOARD_PATTERNS: &[&str] = &["qwerty", "asdfgh", "zxcvbn", "qazwsx", "1qaz2wsx"];
    if KEYBOARD_PATTERNS.iter().any(|p| lower.contains(p)) {
        return true;
    }

    const COMMON_PASSWORDS: &[&str] = &[
        "password1234",
        "password12345",
        "password123456",
        "123456789012",
        "letmein12345",
        "welcome12345",
        "administrator1",
        "iloveyou1234",
        "trustno1trustno1",
    ];
    COMMON_PASSWORDS.contains(&lower.as_str())
}

/// Digits-only runs such as `123456789012` or `987654321098`.
fn is_sequential_numbers(s: &str) -> bool {
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();
    let ascending = digits.windows(2).all(|w| w[1] == (w[0] + 1) % 10);
    let descending = digits.windows(2).all(|w| w[0] == (w[1] + 1) % 10);
    ascending || descending
}
