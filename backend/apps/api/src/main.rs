//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api::config::ServerConfig;
use api::{AppServices, build_app};
use audit::PgAuditSink;
use auth::domain::SessionRepository;
use auth::{IdentityProviders, PgAuthRepository};
use chrono::Utc;
use platform::rate_limit::{InMemoryRateLimiter, RateLimitPolicy, now_ms};
use sqlx::postgres::PgPoolOptions;
use support::PgSupportRepository;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often idle rate-limit buckets are dropped.
const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api=info,auth=info,support=info,audit=info,platform=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let users = Arc::new(PgAuthRepository::new(pool.clone()));

    // Startup cleanup: remove expired sessions
    // Errors here should not prevent server startup
    match users.delete_expired(Utc::now()).await {
        Ok(sessions) => {
            tracing::info!(sessions_deleted = sessions, "Expired session cleanup completed");
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Expired session cleanup failed, continuing anyway"
            );
        }
    }

    let limiter = Arc::new(InMemoryRateLimiter::new());
    spawn_limiter_pruning(limiter.clone());

    let services = AppServices {
        users,
        tickets: Arc::new(PgSupportRepository::new(pool.clone())),
        audit: Arc::new(PgAuditSink::new(pool)),
        limiter,
        providers: IdentityProviders::new(),
    };
    let app = build_app(&config, services)?;

    // Start server
    tracing::info!(
        addr = %config.bind_addr,
        trust_proxy = config.trust_proxy,
        "Listening"
    );

    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Buckets outlive their window only until the next sweep.
fn spawn_limiter_pruning(limiter: Arc<InMemoryRateLimiter>) {
    let longest_window = RateLimitPolicy::auth().config.window;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            let pruned = limiter.prune_idle(longest_window, now_ms());
            if pruned > 0 {
                tracing::debug!(
                    pruned,
                    tracked = limiter.tracked_keys(),
                    "Pruned idle rate-limit buckets"
                );
            }
        }
    });
}
