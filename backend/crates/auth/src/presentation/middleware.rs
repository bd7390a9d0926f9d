//! Auth Middleware
//!
//! Middleware for requiring authentication on protected routes. On success
//! the [`Principal`] and the presented [`SessionToken`] are stored in the
//! request extensions for downstream handlers.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use platform::client::{client_ip, extract_bearer_token};

use audit::{AuditLog, AuditSink};

use crate::application::authorization::{AuthorizationGate, Principal};
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::error::AuthError;

/// Middleware state
pub struct AuthLayerState<R, A> {
    pub gate: AuthorizationGate<R>,
    pub audit: AuditLog<A>,
}

impl<R, A> Clone for AuthLayerState<R, A> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            audit: self.audit.clone(),
        }
    }
}

impl<R, A> AuthLayerState<R, A> {
    pub fn new(gate: AuthorizationGate<R>, audit: AuditLog<A>) -> Self {
        Self { gate, audit }
    }
}

/// Bearer token that authenticated the current request.
#[derive(Clone)]
pub struct SessionToken(pub String);

/// Middleware that requires a valid session.
///
/// No token is 401; a dead token is 403.
pub async fn require_principal<R, A>(
    State(state): State<AuthLayerState<R, A>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError>
where
    R: UserRepository + SessionRepository + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    let token = extract_bearer_token(req.headers()).map(str::to_owned);

    match state.gate.authenticate(token.as_deref()).await {
        Ok(principal) => {
            let extensions = req.extensions_mut();
            extensions.insert::<Principal>(principal);
            if let Some(token) = token {
                extensions.insert(SessionToken(token));
            }
            Ok(next.run(req).await)
        }
        Err(e) => {
            if e.is_infrastructure() {
                let ip = client_ip(req.headers(), req.extensions()).map(|ip| ip.to_string());
                state
                    .audit
                    .record_infrastructure_failure("authenticate", None, ip, &e)
                    .await;
            }
            Err(e)
        }
    }
}
