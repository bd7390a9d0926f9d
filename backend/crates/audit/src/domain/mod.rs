//! Domain Layer

pub mod entry;
pub mod sink;
