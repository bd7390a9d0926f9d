//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use kernel::id::UserId;
use platform::client::ClientAddress;
use platform::credential::CredentialStore;

use audit::{AuditLog, AuditSink};

use crate::application::authorization::{AuthorizationGate, Principal};
use crate::application::config::AuthConfig;
use crate::application::{
    AdminUseCase, LoginInput, LoginUseCase, LogoutUseCase, OAuthSignInInput, OAuthSignInUseCase,
    RegisterInput, RegisterUseCase, UpdateProfileInput, UpdateProfileUseCase,
};
use crate::domain::identity::IdentityProviders;
use crate::domain::repository::AuthStore;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    AuditEntriesResponse, AuditQueryParams, AuthResponse, LoginRequest, MeResponse, OAuthRequest,
    RegisterRequest, SetRoleRequest, TablesResponse, UpdateProfileRequest, UserResponse,
    UsersResponse,
};
use crate::presentation::middleware::{AuthLayerState, SessionToken};

/// Shared state for auth handlers
pub struct AuthAppState<R, A> {
    pub repo: Arc<R>,
    pub audit: AuditLog<A>,
    pub credentials: CredentialStore,
    pub providers: Arc<IdentityProviders>,
    pub config: Arc<AuthConfig>,
}

impl<R, A> Clone for AuthAppState<R, A> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            audit: self.audit.clone(),
            credentials: self.credentials.clone(),
            providers: self.providers.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R, A> AuthAppState<R, A>
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    pub fn new(
        repo: Arc<R>,
        audit: AuditLog<A>,
        credentials: CredentialStore,
        providers: IdentityProviders,
        config: AuthConfig,
    ) -> Self {
        Self {
            repo,
            audit,
            credentials,
            providers: Arc::new(providers),
            config: Arc::new(config),
        }
    }

    pub fn gate(&self) -> AuthorizationGate<R> {
        AuthorizationGate::new(self.repo.clone(), self.config.clone())
    }

    /// State for [`require_principal`](crate::presentation::middleware::require_principal).
    pub fn layer_state(&self) -> AuthLayerState<R, A> {
        AuthLayerState::new(self.gate(), self.audit.clone())
    }

    /// Pass `result` through, recording infrastructure failures in the
    /// audit log before they become an opaque 500.
    async fn audited<T>(
        &self,
        operation: &'static str,
        actor: Option<UserId>,
        client: &ClientAddress,
        result: AuthResult<T>,
    ) -> AuthResult<T> {
        if let Err(e) = &result {
            if e.is_infrastructure() {
                self.audit
                    .record_infrastructure_failure(operation, actor, client.to_audit_string(), e)
                    .await;
            }
        }
        result
    }
}

// ============================================================================
// Register / Login / OAuth
// ============================================================================

/// POST /api/auth/register
pub async fn register<R, A>(
    State(state): State<AuthAppState<R, A>>,
    client: ClientAddress,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AuthResult<Json<AuthResponse>>
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    let use_case = RegisterUseCase::new(
        state.repo.clone(),
        state.audit.clone(),
        state.credentials.clone(),
        state.config.clone(),
    );

    let result = match payload {
        Ok(Json(req)) => {
            let input = RegisterInput {
                name: req.name,
                company: req.company,
                email: req.email,
                password: req.password,
                client_ip: client.to_audit_string(),
            };
            use_case.execute(input).await
        }
        Err(rejection) => Err(use_case
            .reject(rejection.into(), client.to_audit_string())
            .await),
    };
    let output = state.audited("register", None, &client, result).await?;

    Ok(Json(AuthResponse {
        token: output.token,
        user: UserResponse::from(&output.user),
    }))
}

/// POST /api/auth/login
pub async fn login<R, A>(
    State(state): State<AuthAppState<R, A>>,
    client: ClientAddress,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AuthResult<Json<AuthResponse>>
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    let use_case = LoginUseCase::new(
        state.repo.clone(),
        state.audit.clone(),
        state.credentials.clone(),
        state.config.clone(),
    );

    let result = match payload {
        Ok(Json(req)) => {
            let input = LoginInput {
                email: req.email,
                password: req.password,
                client_ip: client.to_audit_string(),
            };
            use_case.execute(input).await
        }
        Err(rejection) => Err(use_case
            .reject(rejection.into(), client.to_audit_string())
            .await),
    };
    let output = state.audited("login", None, &client, result).await?;

    Ok(Json(AuthResponse {
        token: output.token,
        user: UserResponse::from(&output.user),
    }))
}

/// POST /api/auth/oauth/{provider}
pub async fn oauth_sign_in<R, A>(
    State(state): State<AuthAppState<R, A>>,
    Path(provider): Path<String>,
    client: ClientAddress,
    payload: Result<Json<OAuthRequest>, JsonRejection>,
) -> AuthResult<Json<AuthResponse>>
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    let Json(req) = payload?;
    let use_case = OAuthSignInUseCase::new(
        state.repo.clone(),
        state.audit.clone(),
        state.credentials.clone(),
        state.providers.clone(),
        state.config.clone(),
    );

    let input = OAuthSignInInput {
        provider,
        code: req.code,
        client_ip: client.to_audit_string(),
    };

    let result = use_case.execute(input).await;
    let output = state.audited("oauth_sign_in", None, &client, result).await?;

    Ok(Json(AuthResponse {
        token: output.token,
        user: UserResponse::from(&output.user),
    }))
}

// ============================================================================
// Session-bound
// ============================================================================

/// GET /api/auth/me
pub async fn me<R, A>(
    State(state): State<AuthAppState<R, A>>,
    Extension(principal): Extension<Principal>,
    client: ClientAddress,
) -> AuthResult<Json<MeResponse>>
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    let result = state.repo.find_by_id(&principal.user_id).await;
    let user = state
        .audited("me", Some(principal.user_id), &client, result)
        .await?
        .ok_or(AuthError::SessionInvalid)?;

    Ok(Json(MeResponse {
        user: UserResponse::from(&user),
    }))
}

/// PUT /api/auth/update
pub async fn update_profile<R, A>(
    State(state): State<AuthAppState<R, A>>,
    Extension(principal): Extension<Principal>,
    client: ClientAddress,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AuthResult<Json<MeResponse>>
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    let Json(req) = payload?;
    let use_case = UpdateProfileUseCase::new(
        state.repo.clone(),
        state.audit.clone(),
        state.credentials.clone(),
    );

    let input = UpdateProfileInput {
        name: req.name,
        company: req.company,
        email: req.email,
        password: req.password,
        client_ip: client.to_audit_string(),
    };

    let result = use_case.execute(&principal, input).await;
    let user = state
        .audited("update_profile", Some(principal.user_id), &client, result)
        .await?;

    Ok(Json(MeResponse {
        user: UserResponse::from(&user),
    }))
}

/// POST /api/auth/logout
pub async fn logout<R, A>(
    State(state): State<AuthAppState<R, A>>,
    Extension(principal): Extension<Principal>,
    Extension(SessionToken(token)): Extension<SessionToken>,
    client: ClientAddress,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    let use_case = LogoutUseCase::new(state.repo.clone(), state.audit.clone(), state.config.clone());

    let result = use_case
        .execute(&principal, &token, client.to_audit_string())
        .await;
    state
        .audited("logout", Some(principal.user_id), &client, result)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Admin
// ============================================================================

/// GET /api/admin/users
pub async fn list_users<R, A>(
    State(state): State<AuthAppState<R, A>>,
    Extension(principal): Extension<Principal>,
    client: ClientAddress,
) -> AuthResult<Json<UsersResponse>>
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    let use_case = AdminUseCase::new(state.repo.clone(), state.audit.clone());

    let result = use_case.list_users(&principal).await;
    let users = state
        .audited("list_users", Some(principal.user_id), &client, result)
        .await?;

    Ok(Json(UsersResponse {
        users: users.iter().map(UserResponse::from).collect(),
    }))
}

/// PUT /api/admin/users/{id}/role
pub async fn set_role<R, A>(
    State(state): State<AuthAppState<R, A>>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
    client: ClientAddress,
    payload: Result<Json<SetRoleRequest>, JsonRejection>,
) -> AuthResult<Json<MeResponse>>
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    let Json(req) = payload?;
    let use_case = AdminUseCase::new(state.repo.clone(), state.audit.clone());

    let result = use_case
        .set_role(&principal, &user_id, &req.role, client.to_audit_string())
        .await;
    let user = state
        .audited("set_role", Some(principal.user_id), &client, result)
        .await?;

    Ok(Json(MeResponse {
        user: UserResponse::from(&user),
    }))
}

/// GET /api/admin/tables
pub async fn list_tables<R, A>(
    State(state): State<AuthAppState<R, A>>,
    Extension(principal): Extension<Principal>,
    client: ClientAddress,
) -> AuthResult<Json<TablesResponse>>
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    let use_case = AdminUseCase::new(state.repo.clone(), state.audit.clone());

    let result = use_case.table_counts(&principal).await;
    let tables = state
        .audited("list_tables", Some(principal.user_id), &client, result)
        .await?;

    Ok(Json(TablesResponse { tables }))
}

/// GET /api/admin/audit?eventType=&limit=
pub async fn list_audit<R, A>(
    State(state): State<AuthAppState<R, A>>,
    Extension(principal): Extension<Principal>,
    client: ClientAddress,
    Query(params): Query<AuditQueryParams>,
) -> AuthResult<Json<AuditEntriesResponse>>
where
    R: AuthStore,
    A: AuditSink + Send + Sync + 'static,
{
    let use_case = AdminUseCase::new(state.repo.clone(), state.audit.clone());

    let result = use_case
        .audit_entries(&principal, params.event_type.as_deref(), params.limit)
        .await;
    let entries = state
        .audited("list_audit", Some(principal.user_id), &client, result)
        .await?;

    Ok(Json(AuditEntriesResponse { entries }))
}
