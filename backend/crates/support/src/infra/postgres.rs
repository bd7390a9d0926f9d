//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::{TicketId, TicketMessageId, UserId};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::entity::message::message_timestamp;
use crate::domain::entity::{
    MessageAuthor, NewMessage, Service, ServiceAssignment, Ticket, TicketMember, TicketMessage,
    TicketPriority, TicketStatus,
};
use crate::domain::repository::{ServiceRepository, TicketRepository, TicketScope};
use crate::error::{SupportError, SupportResult};

/// PostgreSQL-backed support repository
#[derive(Clone)]
pub struct PgSupportRepository {
    pool: PgPool,
}

impl PgSupportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Row-lock the ticket for the rest of the transaction.
    async fn lock_ticket(
        conn: &mut PgConnection,
        ticket_id: &TicketId,
    ) -> SupportResult<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT id, owner_id, subject, status, priority, created_at, last_update
            FROM tickets
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(ticket_id.as_uuid())
        .fetch_optional(conn)
        .await?;

        row.map(TicketRow::into_ticket).transpose()
    }

    async fn insert_message(conn: &mut PgConnection, message: &TicketMessage) -> SupportResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ticket_messages (id, ticket_id, author_id, text, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.ticket_id.as_uuid())
        .bind(message.author.user_id().map(UserId::into_uuid))
        .bind(&message.text)
        .bind(message.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Append to a ticket locked by [`Self::lock_ticket`].
    async fn append(
        conn: &mut PgConnection,
        mut ticket: Ticket,
        message: NewMessage,
        next_status: Option<TicketStatus>,
        now: DateTime<Utc>,
    ) -> SupportResult<(Ticket, TicketMessage)> {
        let at = message_timestamp(now, ticket.last_update);
        let message = message.stamp(ticket.id, at);
        Self::insert_message(&mut *conn, &message).await?;

        ticket.last_update = at;
        if let Some(status) = next_status {
            ticket.status = status;
        }

        sqlx::query("UPDATE tickets SET status = $2, last_update = $3 WHERE id = $1")
            .bind(ticket.id.as_uuid())
            .bind(ticket.status.code())
            .bind(ticket.last_update)
            .execute(&mut *conn)
            .await?;

        Ok((ticket, message))
    }
}

// ============================================================================
// Ticket Repository Implementation
// ============================================================================

impl TicketRepository for PgSupportRepository {
    async fn create(&self, ticket: &Ticket, first: NewMessage) -> SupportResult<TicketMessage> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tickets (id, owner_id, subject, status, priority, created_at, last_update)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(ticket.id.as_uuid())
        .bind(ticket.owner_id.as_uuid())
        .bind(&ticket.subject)
        .bind(ticket.status.code())
        .bind(ticket.priority.code())
        .bind(ticket.created_at)
        .bind(ticket.last_update)
        .execute(&mut *tx)
        .await?;

        let message = first.stamp(ticket.id, ticket.created_at);
        Self::insert_message(&mut *tx, &message).await?;

        sqlx::query("INSERT INTO ticket_members (ticket_id, user_id, added_at) VALUES ($1, $2, $3)")
            .bind(ticket.id.as_uuid())
            .bind(ticket.owner_id.as_uuid())
            .bind(ticket.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    async fn find(&self, ticket_id: &TicketId) -> SupportResult<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT id, owner_id, subject, status, priority, created_at, last_update
            FROM tickets
            WHERE id = $1
            "#,
        )
        .bind(ticket_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TicketRow::into_ticket).transpose()
    }

    async fn list(&self, scope: TicketScope) -> SupportResult<Vec<Ticket>> {
        let visible_to = match scope {
            TicketScope::All => None,
            TicketScope::VisibleTo(user_id) => Some(user_id.into_uuid()),
        };

        let rows = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT id, owner_id, subject, status, priority, created_at, last_update
            FROM tickets
            WHERE $1::UUID IS NULL
               OR owner_id = $1
               OR id IN (SELECT ticket_id FROM ticket_members WHERE user_id = $1)
            ORDER BY last_update DESC
            "#,
        )
        .bind(visible_to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TicketRow::into_ticket).collect()
    }

    async fn is_member(&self, ticket_id: &TicketId, user_id: &UserId) -> SupportResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM ticket_members WHERE ticket_id = $1 AND user_id = $2)",
        )
        .bind(ticket_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn post_message(
        &self,
        ticket_id: &TicketId,
        message: NewMessage,
        next_status: Option<TicketStatus>,
        now: DateTime<Utc>,
    ) -> SupportResult<Option<(Ticket, TicketMessage)>> {
        let mut tx = self.pool.begin().await?;

        let Some(ticket) = Self::lock_ticket(&mut *tx, ticket_id).await? else {
            return Ok(None);
        };
        let posted = Self::append(&mut *tx, ticket, message, next_status, now).await?;

        tx.commit().await?;
        Ok(Some(posted))
    }

    async fn add_member(
        &self,
        ticket_id: &TicketId,
        user_id: &UserId,
        notice: NewMessage,
        now: DateTime<Utc>,
    ) -> SupportResult<TicketMember> {
        let mut tx = self.pool.begin().await?;

        let ticket = Self::lock_ticket(&mut *tx, ticket_id)
            .await?
            .ok_or(SupportError::TicketNotFound)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO ticket_members (ticket_id, user_id, added_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (ticket_id, user_id) DO NOTHING
            "#,
        )
        .bind(ticket_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(SupportError::AlreadyMember);
        }

        Self::append(&mut *tx, ticket, notice, None, now).await?;
        tx.commit().await?;

        Ok(TicketMember {
            ticket_id: *ticket_id,
            user_id: *user_id,
            added_at: now,
        })
    }

    async fn messages(&self, ticket_id: &TicketId) -> SupportResult<Vec<TicketMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, ticket_id, author_id, text, created_at
            FROM ticket_messages
            WHERE ticket_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(ticket_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    async fn members(&self, ticket_id: &TicketId) -> SupportResult<Vec<TicketMember>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT ticket_id, user_id, added_at
            FROM ticket_members
            WHERE ticket_id = $1
            ORDER BY added_at ASC
            "#,
        )
        .bind(ticket_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MemberRow::into_member).collect())
    }
}

// ============================================================================
// Service Repository Implementation
// ============================================================================

impl ServiceRepository for PgSupportRepository {
    async fn find_service(&self, service_id: i64) -> SupportResult<Option<Service>> {
        let row = sqlx::query_as::<_, ServiceRow>(
            "SELECT id, name, price_cents FROM services WHERE id = $1",
        )
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Service {
            id: r.id,
            name: r.name,
            price_cents: r.price_cents,
        }))
    }

    async fn assign(
        &self,
        ticket_id: &TicketId,
        assignment: &ServiceAssignment,
        notice: NewMessage,
        now: DateTime<Utc>,
    ) -> SupportResult<()> {
        let mut tx = self.pool.begin().await?;

        let ticket = Self::lock_ticket(&mut *tx, ticket_id)
            .await?
            .ok_or(SupportError::TicketNotFound)?;

        let service = &assignment.user_service;
        sqlx::query(
            r#"
            INSERT INTO user_services (id, user_id, service_id, status, progress, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(service.id.as_uuid())
        .bind(service.user_id.as_uuid())
        .bind(service.service_id)
        .bind(&service.status)
        .bind(service.progress)
        .bind(service.created_at)
        .execute(&mut *tx)
        .await?;

        let invoice = &assignment.transaction;
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user_id, amount_cents, issued_at, due_at, status, description
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.user_id.as_uuid())
        .bind(invoice.amount_cents)
        .bind(invoice.issued_at)
        .bind(invoice.due_at)
        .bind(&invoice.status)
        .bind(&invoice.description)
        .execute(&mut *tx)
        .await?;

        Self::append(&mut *tx, ticket, notice, None, now).await?;
        tx.commit().await?;
        Ok(())
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    owner_id: Uuid,
    subject: String,
    status: String,
    priority: String,
    created_at: DateTime<Utc>,
    last_update: DateTime<Utc>,
}

impl TicketRow {
    fn into_ticket(self) -> SupportResult<Ticket> {
        let status = TicketStatus::from_code(&self.status)
            .ok_or_else(|| SupportError::Internal(format!("Invalid ticket status: {}", self.status)))?;
        let priority = TicketPriority::from_code(&self.priority).ok_or_else(|| {
            SupportError::Internal(format!("Invalid ticket priority: {}", self.priority))
        })?;

        Ok(Ticket {
            id: TicketId::from_uuid(self.id),
            owner_id: UserId::from_uuid(self.owner_id),
            subject: self.subject,
            status,
            priority,
            created_at: self.created_at,
            last_update: self.last_update,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    ticket_id: Uuid,
    author_id: Option<Uuid>,
    text: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> TicketMessage {
        TicketMessage {
            id: TicketMessageId::from_uuid(self.id),
            ticket_id: TicketId::from_uuid(self.ticket_id),
            author: MessageAuthor::from(self.author_id.map(UserId::from_uuid)),
            text: self.text,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    ticket_id: Uuid,
    user_id: Uuid,
    added_at: DateTime<Utc>,
}

impl MemberRow {
    fn into_member(self) -> TicketMember {
        TicketMember {
            ticket_id: TicketId::from_uuid(self.ticket_id),
            user_id: UserId::from_uuid(self.user_id),
            added_at: self.added_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: i64,
    name: String,
    price_cents: i64,
}
