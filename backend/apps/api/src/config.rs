//! Server configuration
//!
//! Read once at startup from the process environment (after `.env` has
//! been loaded).

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use auth::AuthConfig;
use platform::credential::{CredentialConfig, MIN_ITERATIONS};
use support::SupportConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";
const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub frontend_origins: Vec<String>,
    pub db_max_connections: u32,
    pub body_limit_bytes: usize,
    /// Honour `X-Forwarded-For` from a reverse proxy
    pub trust_proxy: bool,
    pub auth: AuthConfig,
    pub support: SupportConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset and empty values fall back
    /// to the defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_addr: SocketAddr = parse_or(
            "BIND_ADDR",
            get("BIND_ADDR"),
            DEFAULT_BIND_ADDR.parse::<SocketAddr>()?,
        )?;
        let frontend_origins = get("FRONTEND_ORIGINS")
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let iterations = parse_or(
            "PASSWORD_HASH_ITERATIONS",
            get("PASSWORD_HASH_ITERATIONS"),
            MIN_ITERATIONS,
        )?;
        if iterations < MIN_ITERATIONS {
            bail!("PASSWORD_HASH_ITERATIONS must be at least {MIN_ITERATIONS}, got {iterations}");
        }

        let session_ttl_secs = parse_or("SESSION_TTL_SECS", get("SESSION_TTL_SECS"), 86_400u64)?;
        if session_ttl_secs == 0 {
            bail!("SESSION_TTL_SECS must be positive");
        }

        let auth = AuthConfig {
            session_ttl: Duration::from_secs(session_ttl_secs),
            single_active_session: parse_or(
                "SINGLE_ACTIVE_SESSION",
                get("SINGLE_ACTIVE_SESSION"),
                true,
            )?,
            credential: CredentialConfig {
                iterations,
                ..CredentialConfig::default()
            },
            owner_emails: Vec::new(),
        }
        .with_owner_emails(get("OWNER_EMAILS").unwrap_or_default().split(','));

        let support = SupportConfig {
            allow_reply_on_closed: parse_or(
                "ALLOW_REPLY_ON_CLOSED",
                get("ALLOW_REPLY_ON_CLOSED"),
                true,
            )?,
            ..SupportConfig::default()
        };

        Ok(Self {
            database_url,
            bind_addr,
            frontend_origins,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 5)?,
            body_limit_bytes: parse_or(
                "BODY_LIMIT_BYTES",
                get("BODY_LIMIT_BYTES"),
                DEFAULT_BODY_LIMIT_BYTES,
            )?,
            trust_proxy: parse_or("TRUST_PROXY", get("TRUST_PROXY"), false)?,
            auth,
            support,
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
