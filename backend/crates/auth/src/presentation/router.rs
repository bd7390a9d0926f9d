//! Auth Router

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use platform::middleware::{RateLimitScope, RateLimitState, enforce_rate_limit};
use platform::rate_limit::{RateLimitPolicy, RateLimitStore};

use audit::AuditSink;

use crate::domain::repository::AuthStore;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::require_principal;

/// Routes mounted under `/api/auth`.
///
/// Sign-in routes count every request against the `auth` policy.
pub fn auth_router<R, A, L>(state: AuthAppState<R, A>, limiter: Arc<L>) -> Router
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let auth_limit = RateLimitState::new(limiter, RateLimitPolicy::auth(), RateLimitScope::All);

    let sign_in = Router::new()
        .route("/register", post(handlers::register::<R, A>))
        .route("/login", post(handlers::login::<R, A>))
        .route("/oauth/{provider}", post(handlers::oauth_sign_in::<R, A>))
        .route_layer(from_fn_with_state(auth_limit, enforce_rate_limit::<L>));

    let session = Router::new()
        .route("/me", get(handlers::me::<R, A>))
        .route("/update", put(handlers::update_profile::<R, A>))
        .route("/logout", post(handlers::logout::<R, A>))
        .route_layer(from_fn_with_state(
            state.layer_state(),
            require_principal::<R, A>,
        ));

    sign_in.merge(session).with_state(state)
}

/// Routes mounted under `/api/admin`. Role checks happen per use case.
pub fn admin_router<R, A>(state: AuthAppState<R, A>) -> Router
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    Router::new()
        .route("/users", get(handlers::list_users::<R, A>))
        .route("/users/{id}/role", put(handlers::set_role::<R, A>))
        .route("/tables", get(handlers::list_tables::<R, A>))
        .route("/audit", get(handlers::list_audit::<R, A>))
        .route_layer(from_fn_with_state(
            state.layer_state(),
            require_principal::<R, A>,
        ))
        .with_state(state)
}
