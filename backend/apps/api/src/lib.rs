//! API Application
//!
//! Composes the auth and support routers under `/api` and wraps them in the
//! global layers. Stores are generic so the same composition runs on
//! PostgreSQL in production and on the in-memory stores in tests.
//!
//! Layer order, outermost first:
//! trusted-proxy flag → CORS → trace → security headers → body limit →
//! general rate limit (mutating requests) → per-router auth / rate limits

pub mod config;


use std::sync::Arc;

use audit::{AuditLog, AuditSink};
use auth::presentation::AuthAppState;
use auth::{AuthStore, IdentityProviders, admin_router, auth_router};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::middleware::from_fn_with_state;
use axum::{Extension, Router};
use platform::client::TrustedProxy;
use platform::credential::CredentialStore;
use platform::middleware::{RateLimitScope, RateLimitState, enforce_rate_limit};
use platform::rate_limit::{InMemoryRateLimiter, RateLimitPolicy};
use support::{SupportAppState, SupportStore, support_admin_router, support_router};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

/// Everything the routers are built from.
pub struct AppServices<R, S, A> {
    pub users: Arc<R>,
    pub tickets: Arc<S>,
    pub audit: Arc<A>,
    pub limiter: Arc<InMemoryRateLimiter>,
    pub providers: IdentityProviders,
}

pub fn build_app<R, S, A>(
    config: &ServerConfig,
    services: AppServices<R, S, A>,
) -> anyhow::Result<Router>
where
    R: AuthStore,
    S: SupportStore,
    A: AuditSink + Send + Sync + 'static,
{
    let audit = AuditLog::new(services.audit);
    let credentials = CredentialStore::new(config.auth.credential.clone())?;

    let auth_state = AuthAppState::new(
        services.users.clone(),
        audit.clone(),
        credentials,
        services.providers,
        config.auth.clone(),
    );
    let support_state = SupportAppState::new(
        services.tickets,
        services.users,
        audit,
        config.support.clone(),
    );

    let admin = admin_router(auth_state.clone()).merge(support_admin_router(
        support_state.clone(),
        auth_state.layer_state(),
    ));

    let general_limit = RateLimitState::new(
        services.limiter.clone(),
        RateLimitPolicy::general(),
        RateLimitScope::Mutating,
    );

    let api = Router::new()
        .nest("/auth", auth_router(auth_state.clone(), services.limiter))
        .nest("/admin", admin)
        .nest(
            "/tickets",
            support_router(support_state, auth_state.layer_state()),
        )
        .layer(from_fn_with_state(
            general_limit,
            enforce_rate_limit::<InMemoryRateLimiter>,
        ));

    Ok(Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(security_header(header::X_FRAME_OPTIONS, "DENY"))
        .layer(security_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(security_header(
            header::REFERRER_POLICY,
            "strict-origin-when-cross-origin",
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&config.frontend_origins))
        .layer(Extension(TrustedProxy(config.trust_proxy))))
}

fn security_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}

fn cors(origins: &[String]) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true)
}
