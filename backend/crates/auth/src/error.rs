//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::credential::CredentialError;
use platform::password::PasswordPolicyError;
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed or out-of-range request field
    #[error("{0}")]
    Validation(String),

    /// Request body exceeded the configured limit
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Password rejected by the policy
    #[error(transparent)]
    PasswordPolicy(#[from] PasswordPolicyError),

    /// Email already registered. The message names no field.
    #[error("User already exists")]
    UserAlreadyExists,

    /// Referral code collision; retried by registration
    #[error("Referral code already taken")]
    ReferralCodeTaken,

    /// Unknown email or wrong password (indistinguishable on purpose)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No bearer token presented
    #[error("Authentication required")]
    Unauthenticated,

    /// Token unknown, expired, or its user is gone
    #[error("Invalid or expired session")]
    SessionInvalid,

    /// Authenticated, but the role is insufficient
    #[error("Insufficient permissions")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error("Unknown identity provider")]
    UnknownProvider,

    /// Identity provider exchange failed
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    /// Key derivation failed
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_)
            | AuthError::PasswordPolicy(_)
            | AuthError::UserAlreadyExists => ErrorKind::BadRequest,
            AuthError::PayloadTooLarge => ErrorKind::PayloadTooLarge,
            AuthError::ReferralCodeTaken => ErrorKind::Conflict,
            AuthError::InvalidCredentials | AuthError::Unauthenticated => {
                ErrorKind::Unauthorized
            }
            AuthError::SessionInvalid | AuthError::Forbidden => ErrorKind::Forbidden,
            AuthError::UserNotFound | AuthError::UnknownProvider => ErrorKind::NotFound,
            AuthError::IdentityProvider(_) => ErrorKind::ServiceUnavailable,
            AuthError::Credential(_) | AuthError::Database(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Infrastructure failures; these are audit-logged and rendered opaquely.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            AuthError::Credential(_) | AuthError::Database(_) | AuthError::Internal(_)
        )
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        match self {
            e if e.is_infrastructure() => AppError::internal("Internal server error"),
            AuthError::IdentityProvider(_) => {
                AppError::service_unavailable("Identity provider unavailable")
            }
            AuthError::Unauthenticated => AppError::unauthorized(self.to_string())
                .with_action("Send an Authorization: Bearer <token> header"),
            AuthError::SessionInvalid => {
                AppError::forbidden(self.to_string()).with_action("Sign in again")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Credential(e) => {
                tracing::error!(error = %e, "Credential store failure");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::IdentityProvider(msg) => {
                tracing::warn!(message = %msg, "Identity provider exchange failed");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::SessionInvalid => {
                tracing::info!("Rejected invalid or expired session");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::BadRequest => AuthError::Validation(err.message().to_string()),
            ErrorKind::PayloadTooLarge => AuthError::PayloadTooLarge,
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::from(rejection).into()
    }
}
