//! Audit Log
//!
//! Append-only record of security-relevant events, kept apart from the
//! operational `tracing` output.
//!
//! - `domain/` - entries, the enumerated event types and the sink trait
//! - `application/` - the [`AuditLog`] service handed to other crates
//! - `infra/` - PostgreSQL and in-memory sinks
//!
//! Recording never fails the calling request: a sink error is reported
//! through `tracing::error!` and swallowed.

pub mod application;
pub mod domain;
pub mod infra;

pub use application::audit_log::AuditLog;
pub use domain::entry::{AuditEntryId, AuditEvent, AuditEventType, AuditLogEntry, AuditQuery};
pub use domain::sink::AuditSink;
pub use infra::memory::MemoryAuditSink;
pub use infra::postgres::PgAuditSink;
