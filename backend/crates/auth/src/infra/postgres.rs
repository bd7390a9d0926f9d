//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::error::conversions::is_unique_violation;
use kernel::id::UserId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{
    session::Session,
    user::{PasswordCredential, User},
};
use crate::domain::repository::{
    INSPECTABLE_TABLES, SessionRepository, TableCount, TableInventory, UserRepository,
};
use crate::domain::value_object::{
    display_name::DisplayName, email::Email, referral_code::ReferralCode, user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

const REFERRAL_CODE_CONSTRAINT: &str = "users_referral_code_key";

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write_user<'e, E>(executor: E, user: &User) -> AuthResult<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            UPDATE users SET
                name = $2,
                email = $3,
                password_hash = $4,
                password_salt = $5,
                company = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.display_name.as_str())
        .bind(user.email.as_str())
        .bind(&user.credential.hash)
        .bind(&user.credential.salt)
        .bind(user.company.as_deref())
        .bind(user.updated_at)
        .execute(executor)
        .await
        .map_err(map_user_write_error)?;

        Ok(())
    }
}

/// Unique violations on `users` carry no field detail to the caller, except
/// that referral-code collisions are retried internally.
fn map_user_write_error(err: sqlx::Error) -> AuthError {
    if is_unique_violation(&err) {
        let constraint = err
            .as_database_error()
            .and_then(|db| db.constraint())
            .unwrap_or_default();
        if constraint == REFERRAL_CODE_CONSTRAINT {
            return AuthError::ReferralCodeTaken;
        }
        return AuthError::UserAlreadyExists;
    }
    AuthError::Database(err)
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn create(&self, user: &User) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id,
                name,
                email,
                password_hash,
                password_salt,
                role,
                company,
                referral_code,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.display_name.as_str())
        .bind(user.email.as_str())
        .bind(&user.credential.hash)
        .bind(&user.credential.salt)
        .bind(user.role.code())
        .bind(user.company.as_deref())
        .bind(user.referral_code.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_user_write_error)?;

        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, password_salt, role, company,
                   referral_code, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user()).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, password_salt, role, company,
                   referral_code, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user()).transpose()
    }

    async fn find_many(&self, user_ids: &[UserId]) -> AuthResult<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = user_ids.iter().map(|id| *id.as_uuid()).collect();

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, password_salt, role, company,
                   referral_code, created_at, updated_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        Self::write_user(&self.pool, user).await
    }

    async fn update_and_revoke_sessions(&self, user: &User) -> AuthResult<u64> {
        let mut tx = self.pool.begin().await?;

        Self::write_user(&mut *tx, user).await?;

        let revoked = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user.user_id.as_uuid())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(revoked)
    }

    async fn list(&self) -> AuthResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, password_salt, role, company,
                   referral_code, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn set_role(&self, user_id: &UserId, role: UserRole) -> AuthResult<bool> {
        let updated = sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id.as_uuid())
            .bind(role.code())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(updated > 0)
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for PgAuthRepository {
    async fn replace_for_user(&self, session: &Session, revoke_others: bool) -> AuthResult<u64> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the user serializes concurrent logins for the same account.
        sqlx::query("SELECT 1 FROM users WHERE id = $1 FOR UPDATE")
            .bind(session.user_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        let revoked = if revoke_others {
            sqlx::query("DELETE FROM sessions WHERE user_id = $1")
                .bind(session.user_id.as_uuid())
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            0
        };

        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.token_hash)
        .bind(session.user_id.as_uuid())
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(revoked)
    }

    async fn find(&self, token_hash: &str) -> AuthResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT token_hash, user_id, created_at, expires_at
            FROM sessions
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SessionRow::into_session))
    }

    async fn delete(&self, token_hash: &str) -> AuthResult<bool> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn delete_all_for_user(&self, user_id: &UserId) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired sessions");

        Ok(deleted)
    }
}

// ============================================================================
// Table Inventory Implementation
// ============================================================================

impl TableInventory for PgAuthRepository {
    async fn table_counts(&self) -> AuthResult<Vec<TableCount>> {
        let mut counts = Vec::with_capacity(INSPECTABLE_TABLES.len());

        for table in INSPECTABLE_TABLES {
            // Identifiers cannot be bound; `table` comes from the fixed list.
            let rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&self.pool)
                .await?;
            counts.push(TableCount {
                table: table.to_string(),
                rows,
            });
        }

        Ok(counts)
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    password_salt: String,
    role: String,
    company: Option<String>,
    referral_code: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        let role = UserRole::from_code(&self.role)
            .ok_or_else(|| AuthError::Internal(format!("Invalid role: {}", self.role)))?;

        Ok(User {
            user_id: UserId::from_uuid(self.id),
            display_name: DisplayName::from_db(self.name),
            email: Email::from_db(self.email),
            credential: PasswordCredential {
                hash: self.password_hash,
                salt: self.password_salt,
            },
            role,
            company: self.company,
            referral_code: ReferralCode::from_db(self.referral_code),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    token_hash: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> Session {
        Session {
            token_hash: self.token_hash,
            user_id: UserId::from_uuid(self.user_id),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}
