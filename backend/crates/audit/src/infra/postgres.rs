//! PostgreSQL audit sink

use chrono::{DateTime, Utc};
use kernel::error::app_error::{AppError, AppResult};
use kernel::id::UserId;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::domain::entry::{AuditEntryId, AuditEventType, AuditLogEntry, AuditQuery};
use crate::domain::sink::AuditSink;

#[derive(Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AuditRow {
    id: Uuid,
    event_type: String,
    actor_id: Option<Uuid>,
    client_ip: Option<String>,
    metadata: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_entry(self) -> AppResult<AuditLogEntry> {
        let event_type: AuditEventType = self
            .event_type
            .parse()
            .map_err(|e| AppError::internal("Corrupt audit record").with_source(e))?;

        Ok(AuditLogEntry {
            id: AuditEntryId::from_uuid(self.id),
            event_type,
            actor_id: self.actor_id.map(UserId::from_uuid),
            client_ip: self.client_ip,
            metadata: self.metadata.0,
            created_at: self.created_at,
        })
    }
}

impl AuditSink for PgAuditSink {
    async fn append(&self, entry: &AuditLogEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, event_type, actor_id, client_ip, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.event_type.as_str())
        .bind(entry.actor_id.map(UserId::into_uuid))
        .bind(entry.client_ip.as_deref())
        .bind(Json(&entry.metadata))
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, query: &AuditQuery) -> AppResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, event_type, actor_id, client_ip, metadata, created_at
            FROM audit_log
            WHERE ($1::TEXT IS NULL OR event_type = $1)
            ORDER BY created_at DESC, seq DESC
            LIMIT $2
            "#,
        )
        .bind(query.event_type.map(|t| t.as_str()))
        .bind(i64::from(query.limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditRow::into_entry).collect()
    }
}
