//! Support Error Types
//!
//! Ticket-workflow error variants that integrate with the unified
//! `kernel::error::AppError` system.

use auth::AuthError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Support-specific result type alias
pub type SupportResult<T> = Result<T, SupportError>;

#[derive(Debug, Error)]
pub enum SupportError {
    /// Malformed or out-of-range request field
    #[error("{0}")]
    Validation(String),

    /// Request body exceeded the configured limit
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Caller may not see or change this ticket
    #[error("Access denied")]
    Forbidden,

    #[error("Ticket not found")]
    TicketNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Service not found")]
    ServiceNotFound,

    /// Duplicate invite
    #[error("User is already a member of this ticket")]
    AlreadyMember,

    /// Reply to a closed ticket while such replies are disabled
    #[error("Ticket is closed")]
    TicketClosed,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SupportError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SupportError::Validation(_) => ErrorKind::BadRequest,
            SupportError::PayloadTooLarge => ErrorKind::PayloadTooLarge,
            SupportError::Forbidden => ErrorKind::Forbidden,
            SupportError::TicketNotFound
            | SupportError::UserNotFound
            | SupportError::ServiceNotFound => ErrorKind::NotFound,
            SupportError::AlreadyMember | SupportError::TicketClosed => ErrorKind::Conflict,
            SupportError::Database(_) | SupportError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Infrastructure failures; these are audit-logged and rendered opaquely.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, SupportError::Database(_) | SupportError::Internal(_))
    }

    pub fn to_app_error(&self) -> AppError {
        if self.is_infrastructure() {
            return AppError::internal("Internal server error");
        }
        AppError::new(self.kind(), self.to_string())
    }

    fn log(&self) {
        match self {
            SupportError::Database(e) => {
                tracing::error!(error = %e, "Support database error");
            }
            SupportError::Internal(msg) => {
                tracing::error!(message = %msg, "Support internal error");
            }
            SupportError::Forbidden => {
                tracing::warn!("Ticket access denied");
            }
            _ => {
                tracing::debug!(error = %self, "Support error");
            }
        }
    }
}

impl IntoResponse for SupportError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for SupportError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::BadRequest => SupportError::Validation(err.message().to_string()),
            ErrorKind::PayloadTooLarge => SupportError::PayloadTooLarge,
            _ => SupportError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for SupportError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::from(rejection).into()
    }
}

/// User lookups go through the auth repository.
impl From<AuthError> for SupportError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => SupportError::Validation(msg),
            AuthError::Forbidden => SupportError::Forbidden,
            AuthError::UserNotFound => SupportError::UserNotFound,
            AuthError::Database(e) => SupportError::Database(e),
            other => SupportError::Internal(other.to_string()),
        }
    }
}
