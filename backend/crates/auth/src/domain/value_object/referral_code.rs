//! Referral Code Value Object
//!
//! `ABC1234`: three letters taken from the display name, then a random
//! number in `1000..=9999`.

use rand::Rng;
use derive_more::Display;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Display, Hash, Serialize)]
#[serde(transparent)]
pub struct ReferralCode(String);

impl ReferralCode {
    /// The first three ASCII letters of `name`, upper-cased and padded with
    /// `X`, followed by four random digits.
    pub fn generate(name: &str) -> Self {
        let number = rand::rng().random_range(1000..=9999);
        Self::with_number(name, number)
    }

    fn with_number(name: &str, number: u16) -> Self {
        let mut prefix: String = name
            .chars()
            .filter(char::is_ascii_alphabetic)
            .take(3)
            .map(|c| c.to_ascii_uppercase())
            .collect();
        while prefix.len() < 3 {
            prefix.push('X');
        }
        Self(format!("{prefix}{number}"))
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_from_name() {
        assert_eq!(ReferralCode::with_number("alice", 1234).as_str(), "ALI1234");
        assert_eq!(ReferralCode::with_number("J. Doe", 5000).as_str(), "JDO5000");
    }

    #[test]
    fn test_prefix_padding() {
        assert_eq!(ReferralCode::with_number("Bo", 1000).as_str(), "BOX1000");
        assert_eq!(ReferralCode::with_number("李小龍", 9999).as_str(), "XXX9999");
    }

    #[test]
    fn test_generated_shape() {
        for _ in 0..50 {
            let code = ReferralCode::generate("Grace Hopper");
            let s = code.as_str();
            assert_eq!(s.len(), 7);
            assert!(s.starts_with("GRA"));
            let n: u16 = s[3..].parse().unwrap();
            assert!((1000..=9999).contains(&n));
        }
    }
}
