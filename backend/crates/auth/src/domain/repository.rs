//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the
//! infrastructure layer.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use serde::Serialize;

use crate::domain::entity::{session::Session, user::User};
use crate::domain::value_object::{email::Email, user_role::UserRole};
use crate::error::AuthResult;

/// Tables an owner may inspect through the admin API.
pub const INSPECTABLE_TABLES: [&str; 9] = [
    "users",
    "sessions",
    "services",
    "user_services",
    "transactions",
    "tickets",
    "ticket_messages",
    "ticket_members",
    "audit_log",
];

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert a new user.
    ///
    /// Fails with `UserAlreadyExists` on a taken email and
    /// `ReferralCodeTaken` on a referral-code collision.
    async fn create(&self, user: &User) -> AuthResult<()>;

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    /// Users among `user_ids`; unknown ids are skipped.
    async fn find_many(&self, user_ids: &[UserId]) -> AuthResult<Vec<User>>;

    /// Persist profile fields and credential. `UserAlreadyExists` on a taken email.
    async fn update(&self, user: &User) -> AuthResult<()>;

    /// `update` and delete every session of the user in one transaction.
    /// Returns the number of sessions revoked.
    async fn update_and_revoke_sessions(&self, user: &User) -> AuthResult<u64>;

    /// All users, newest first.
    async fn list(&self) -> AuthResult<Vec<User>>;

    /// Returns `false` when the user does not exist.
    async fn set_role(&self, user_id: &UserId, role: UserRole) -> AuthResult<bool>;
}

/// Session repository trait
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    /// Store `session`, first deleting the user's other sessions when
    /// `revoke_others` is set. Both happen in one atomic unit so concurrent
    /// logins leave at most one session behind. Returns the number revoked.
    async fn replace_for_user(&self, session: &Session, revoke_others: bool) -> AuthResult<u64>;

    async fn find(&self, token_hash: &str) -> AuthResult<Option<Session>>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, token_hash: &str) -> AuthResult<bool>;

    async fn delete_all_for_user(&self, user_id: &UserId) -> AuthResult<u64>;

    async fn delete_expired(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

/// Row counts for [`INSPECTABLE_TABLES`], in that order.
#[trait_variant::make(TableInventory: Send)]
pub trait LocalTableInventory {
    async fn table_counts(&self) -> AuthResult<Vec<TableCount>>;
}

/// Everything the auth HTTP layer needs from one store.
pub trait AuthStore:
    UserRepository + SessionRepository + TableInventory + Send + Sync + 'static
{
}

impl<T> AuthStore for T where
    T: UserRepository + SessionRepository + TableInventory + Send + Sync + 'static
{
}
