//! Support Router

use axum::{Router, middleware::from_fn_with_state, routing::{get, post}};
use auth::AuthStore;
use auth::presentation::{AuthLayerState, require_principal};

use audit::AuditSink;

use crate::domain::repository::SupportStore;
use crate::presentation::handlers::{self, SupportAppState};

/// Routes mounted under `/api/tickets`. Every route needs a session.
pub fn support_router<S, U, A>(
    state: SupportAppState<S, U, A>,
    auth_layer: AuthLayerState<U, A>,
) -> Router
where
    S: SupportStore,
    U: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/",
            post(handlers::create_ticket::<S, U, A>).get(handlers::list_tickets::<S, U, A>),
        )
        .route("/{id}/reply", post(handlers::reply::<S, U, A>))
        .route("/{id}/invite", post(handlers::invite::<S, U, A>))
        .route("/{id}/close", post(handlers::close::<S, U, A>))
        .route("/{id}/messages", get(handlers::list_messages::<S, U, A>))
        .route("/{id}/members", get(handlers::list_members::<S, U, A>))
        .route_layer(from_fn_with_state(auth_layer, require_principal::<U, A>))
        .with_state(state)
}

/// Ticket routes merged into `/api/admin`. Role checks happen per use case.
pub fn support_admin_router<S, U, A>(
    state: SupportAppState<S, U, A>,
    auth_layer: AuthLayerState<U, A>,
) -> Router
where
    S: SupportStore,
    U: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/tickets/{id}/assign-service",
            post(handlers::assign_service::<S, U, A>),
        )
        .route_layer(from_fn_with_state(auth_layer, require_principal::<U, A>))
        .with_state(state)
}
