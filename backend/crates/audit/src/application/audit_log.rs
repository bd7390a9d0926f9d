//! Audit Log service

use std::sync::Arc;

use chrono::Utc;
use kernel::error::app_error::AppResult;
use kernel::id::UserId;

use crate::domain::entry::{AuditEvent, AuditEventType, AuditLogEntry, AuditQuery};
use crate::domain::sink::AuditSink;

/// Best-effort durable audit recorder shared by every domain crate.
pub struct AuditLog<S> {
    sink: Arc<S>,
}

impl<S> Clone for AuditLog<S> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
        }
    }
}

impl<S> AuditLog<S>
where
    S: AuditSink + Send + Sync + 'static,
{
    pub fn new(sink: Arc<S>) -> Self {
        Self { sink }
    }

    /// Stamp and append `event`. Sink failures are logged, never returned.
    pub async fn record(&self, event: AuditEvent) {
        let entry = AuditLogEntry::from_event(event, Utc::now());

        match self.sink.append(&entry).await {
            Ok(()) => {
                tracing::debug!(
                    event_type = %entry.event_type,
                    actor_id = ?entry.actor_id,
                    "Audit event recorded"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_type = %entry.event_type,
                    actor_id = ?entry.actor_id,
                    metadata = %entry.metadata,
                    "Failed to persist audit event"
                );
            }
        }
    }

    /// Record an `INFRASTRUCTURE_FAILURE` with the full error text before the
    /// caller answers with an opaque 500.
    pub async fn record_infrastructure_failure(
        &self,
        operation: &'static str,
        actor: Option<UserId>,
        client_ip: Option<String>,
        error: &(dyn std::error::Error + Send + Sync),
    ) {
        let mut event = AuditEvent::new(AuditEventType::InfrastructureFailure)
            .client_ip(client_ip)
            .meta("operation", operation)
            .meta("error", error.to_string());
        if let Some(actor) = actor {
            event = event.actor(actor);
        }
        self.record(event).await;
    }

    pub async fn recent(&self, query: &AuditQuery) -> AppResult<Vec<AuditLogEntry>> {
        self.sink.recent(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryAuditSink;
    use kernel::error::app_error::AppError;

    struct FailingSink;

    impl AuditSink for FailingSink {
        async fn append(&self, _entry: &AuditLogEntry) -> AppResult<()> {
            Err(AppError::service_unavailable("sink down"))
        }

        async fn recent(&self, _query: &AuditQuery) -> AppResult<Vec<AuditLogEntry>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_record_appends_entry() {
        let sink = Arc::new(MemoryAuditSink::new());
        let log = AuditLog::new(sink.clone());
        let user = UserId::new();

        log.record(
            AuditEvent::new(AuditEventType::AuthLoginSuccess)
                .actor(user)
                .client_ip(Some("127.0.0.1".into())),
        )
        .await;

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_type, AuditEventType::AuthLoginSuccess);
        assert_eq!(entries[0].actor_id, Some(user));
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let log = AuditLog::new(Arc::new(FailingSink));
        // Completes without panicking or surfacing the error
        log.record(AuditEvent::new(AuditEventType::TicketReply)).await;
    }

    #[tokio::test]
    async fn test_recent_filters_and_orders() {
        let sink = Arc::new(MemoryAuditSink::new());
        let log = AuditLog::new(sink);

        log.record(AuditEvent::new(AuditEventType::AuthLoginFailed).meta("n", 1))
            .await;
        log.record(AuditEvent::new(AuditEventType::TicketCreated)).await;
        log.record(AuditEvent::new(AuditEventType::AuthLoginFailed).meta("n", 2))
            .await;

        let failed = log
            .recent(&AuditQuery::new(Some(AuditEventType::AuthLoginFailed), None))
            .await
            .unwrap();
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].metadata["n"], 2);
        assert_eq!(failed[1].metadata["n"], 1);

        let latest = log.recent(&AuditQuery::new(None, Some(1))).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].event_type, AuditEventType::AuthLoginFailed);
    }

    #[tokio::test]
    async fn test_infrastructure_failure_keeps_detail() {
        let sink = Arc::new(MemoryAuditSink::new());
        let log = AuditLog::new(sink.clone());
        let err = AppError::internal("pool timed out after 30s");

        log.record_infrastructure_failure("login", None, None, &err)
            .await;

        let entries = sink.entries();
        assert_eq!(entries[0].event_type, AuditEventType::InfrastructureFailure);
        assert_eq!(entries[0].metadata["operation"], "login");
        assert!(
            entries[0].metadata["error"]
                .as_str()
                .unwrap()
                .contains("pool timed out")
        );
    }
}
