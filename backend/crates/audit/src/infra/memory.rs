//! In-process audit sink for tests and local runs without a database.

use std::sync::{Mutex, PoisonError};

use kernel::error::app_error::AppResult;

use crate::domain::entry::{AuditLogEntry, AuditQuery};
use crate::domain::sink::AuditSink;

#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot in insertion order.
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: &AuditLogEntry) -> AppResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }

    async fn recent(&self, query: &AuditQuery) -> AppResult<Vec<AuditLogEntry>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .rev()
            .filter(|e| query.event_type.is_none_or(|t| t == e.event_type))
            .take(query.limit as usize)
            .cloned()
            .collect())
    }
}
