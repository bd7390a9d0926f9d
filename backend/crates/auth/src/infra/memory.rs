//! In-memory auth repository.
//!
//! Mirrors the PostgreSQL constraints (unique email, unique referral code,
//! atomic session replacement) behind a single lock.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use kernel::id::UserId;

use crate::domain::entity::{session::Session, user::User};
use crate::domain::repository::{
    INSPECTABLE_TABLES, SessionRepository, TableCount, TableInventory, UserRepository,
};
use crate::domain::value_object::{email::Email, user_role::UserRole};
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    sessions: HashMap<String, Session>,
}

impl State {
    fn check_unique(&self, user: &User) -> AuthResult<()> {
        for other in self.users.values().filter(|u| u.user_id != user.user_id) {
            if other.email == user.email {
                return Err(AuthError::UserAlreadyExists);
            }
            if other.referral_code == user.referral_code {
                return Err(AuthError::ReferralCodeTaken);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryAuthRepository {
    state: Mutex<State>,
}

impl MemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a user directly, bypassing registration.
    pub fn insert_user(&self, user: User) -> AuthResult<()> {
        let mut state = self.lock();
        state.check_unique(&user)?;
        state.users.insert(user.user_id, user);
        Ok(())
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }
}

impl UserRepository for MemoryAuthRepository {
    async fn create(&self, user: &User) -> AuthResult<()> {
        self.insert_user(user.clone())
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        Ok(self.lock().users.get(user_id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn find_many(&self, user_ids: &[UserId]) -> AuthResult<Vec<User>> {
        let state = self.lock();
        Ok(user_ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        let mut state = self.lock();
        if !state.users.contains_key(&user.user_id) {
            return Err(AuthError::UserNotFound);
        }
        state.check_unique(user)?;
        state.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn update_and_revoke_sessions(&self, user: &User) -> AuthResult<u64> {
        let mut state = self.lock();
        if !state.users.contains_key(&user.user_id) {
            return Err(AuthError::UserNotFound);
        }
        state.check_unique(user)?;
        state.users.insert(user.user_id, user.clone());

        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.user_id != user.user_id);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn list(&self) -> AuthResult<Vec<User>> {
        let mut users: Vec<User> = self.lock().users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn set_role(&self, user_id: &UserId, role: UserRole) -> AuthResult<bool> {
        let mut state = self.lock();
        match state.users.get_mut(user_id) {
            Some(user) => {
                user.role = role;
                user.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl SessionRepository for MemoryAuthRepository {
    async fn replace_for_user(&self, session: &Session, revoke_others: bool) -> AuthResult<u64> {
        let mut state = self.lock();
        let before = state.sessions.len();
        if revoke_others {
            state.sessions.retain(|_, s| s.user_id != session.user_id);
        }
        let revoked = (before - state.sessions.len()) as u64;
        state
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(revoked)
    }

    async fn find(&self, token_hash: &str) -> AuthResult<Option<Session>> {
        Ok(self.lock().sessions.get(token_hash).cloned())
    }

    async fn delete(&self, token_hash: &str) -> AuthResult<bool> {
        Ok(self.lock().sessions.remove(token_hash).is_some())
    }

    async fn delete_all_for_user(&self, user_id: &UserId) -> AuthResult<u64> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state.sessions.retain(|_, s| &s.user_id != user_id);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - state.sessions.len()) as u64)
    }
}

impl TableInventory for MemoryAuthRepository {
    /// Tables this store does not hold report zero rows.
    async fn table_counts(&self) -> AuthResult<Vec<TableCount>> {
        let state = self.lock();
        Ok(INSPECTABLE_TABLES
            .iter()
            .map(|table| TableCount {
                table: table.to_string(),
                rows: match *table {
                    "users" => state.users.len() as i64,
                    "sessions" => state.sessions.len() as i64,
                    _ => 0,
                },
            })
            .collect())
    }
}
