use serde::{Deserialize, Serialize};
use std::fmt;

/// Flat role set. `Team` and `Owner` are the privileged roles; only `Owner`
/// may change roles or inspect raw tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Team,
    Owner,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::User, UserRole::Team, UserRole::Owner];

    #[inline]
    pub const fn code(&self) -> &'static str {
        use UserRole::*;
        match self {
            User => "user",
            Team => "team",
            Owner => "owner",
        }
    }

    #[inline]
    pub const fn is_privileged(&self) -> bool {
        matches!(self, UserRole::Team | UserRole::Owner)
    }

    #[inline]
    pub const fn is_owner(&self) -> bool {
        matches!(self, UserRole::Owner)
    }

    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_from_code() {
        assert_eq!(UserRole::from_code("user"), Some(UserRole::User));
        assert_eq!(UserRole::from_code("team"), Some(UserRole::Team));
        assert_eq!(UserRole::from_code("owner"), Some(UserRole::Owner));
        assert_eq!(UserRole::from_code("admin"), None);
        assert_eq!(UserRole::from_code("Owner"), None);
    }

    #[test]
    fn test_user_role_display() {
        assert_eq!(UserRole::User.to_string(), "user");
        assert_eq!(UserRole::Team.to_string(), "team");
        assert_eq!(UserRole::Owner.to_string(), "owner");
    }

    #[test]
    fn test_user_role_checks() {
        assert!(!UserRole::User.is_privileged());
        assert!(UserRole::Team.is_privileged());
        assert!(UserRole::Owner.is_privileged());
        assert!(!UserRole::User.is_owner());
        assert!(!UserRole::Team.is_owner());
        assert!(UserRole::Owner.is_owner());
    }

    #[test]
    fn test_user_role_serde() {
        assert_eq!(serde_json::to_string(&UserRole::Team).unwrap(), "\"team\"");
        let role: UserRole = serde_json::from_str("\"owner\"").unwrap();
        assert_eq!(role, UserRole::Owner);
    }
}
