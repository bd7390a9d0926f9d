//! Infrastructure Layer

pub mod memory;
pub mod postgres;

pub use memory::MemorySupportRepository;
pub use postgres::PgSupportRepository;
