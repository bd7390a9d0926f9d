//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, random tokens, constant-time compare)
//! - Password policy and the PBKDF2-HMAC-SHA512 credential store
//! - Sliding-window rate limiting and its axum middleware
//! - Client address and bearer-token extraction

pub mod client;
pub mod credential;
pub mod crypto;
pub mod middleware;
pub mod password;
pub mod rate_limit;
