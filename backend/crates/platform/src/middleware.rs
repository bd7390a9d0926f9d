//! Rate limit middleware
//!
//! Wire with `axum::middleware::from_fn_with_state(state, enforce_rate_limit::<S>)`.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request};
use axum::middleware::Next;
use axum::response::Response;
use kernel::error::app_error::AppError;

use crate::client::{client_ip, client_key};
use crate::rate_limit::{RateLimitPolicy, RateLimitStore};

/// Which requests a policy counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitScope {
    /// Every request reaching the layer.
    All,
    /// POST, PUT, PATCH and DELETE only.
    Mutating,
}

impl RateLimitScope {
    fn applies_to(&self, method: &Method) -> bool {
        match self {
            RateLimitScope::All => true,
            RateLimitScope::Mutating => matches!(
                *method,
                Method::POST | Method::PUT | Method::PATCH | Method::DELETE
            ),
        }
    }
}

pub struct RateLimitState<S> {
    pub store: Arc<S>,
    pub policy: RateLimitPolicy,
    pub scope: RateLimitScope,
}

impl<S> Clone for RateLimitState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy,
            scope: self.scope,
        }
    }
}

impl<S> RateLimitState<S> {
    pub fn new(store: Arc<S>, policy: RateLimitPolicy, scope: RateLimitScope) -> Self {
        Self {
            store,
            policy,
            scope,
        }
    }
}

/// Reject with 429 and `Retry-After` once the client's window is full.
///
/// A failing backend lets the request through; throttling is back-pressure,
/// not an access control.
pub async fn enforce_rate_limit<S>(
    State(state): State<RateLimitState<S>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError>
where
    S: RateLimitStore + Send + Sync + 'static,
{
    if !state.scope.applies_to(req.method()) {
        return Ok(next.run(req).await);
    }

    let client = client_key(client_ip(req.headers(), req.extensions()));
    let key = state.policy.key_for(&client);

    match state.store.check(&key, &state.policy.config).await {
        Ok(decision) if !decision.allowed => {
            let retry_after = decision.retry_after_secs.unwrap_or(1);
            tracing::warn!(
                policy = state.policy.name,
                client = %client,
                retry_after_secs = retry_after,
                "Rate limit exceeded"
            );
            Err(AppError::too_many_requests(
                "Too many requests, please try again later",
                retry_after,
            ))
        }
        Ok(_) => Ok(next.run(req).await),
        Err(e) => {
            tracing::error!(policy = state.policy.name, error = %e, "Rate limit check failed");
            Ok(next.run(req).await)
        }
    }
}
