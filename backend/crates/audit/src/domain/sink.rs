//! Persistence seam for audit entries.

use kernel::error::app_error::AppResult;

use crate::domain::entry::{AuditLogEntry, AuditQuery};

#[trait_variant::make(AuditSink: Send)]
pub trait LocalAuditSink {
    /// Append one entry. Entries are never updated or deleted.
    async fn append(&self, entry: &AuditLogEntry) -> AppResult<()>;

    /// Most recent entries first, filtered by `query`.
    async fn recent(&self, query: &AuditQuery) -> AppResult<Vec<AuditLogEntry>>;
}
