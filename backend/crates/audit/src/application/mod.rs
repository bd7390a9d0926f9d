//! Application Layer

pub mod audit_log;
