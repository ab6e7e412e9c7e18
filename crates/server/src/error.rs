//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Errors render as the JSON
//! failure envelope `{"success": false, "error": "..."}`; server-side
//! failures are captured to Sentry and their detail is hidden from clients.

use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use ledgerdesk_core::{InvalidVariant, ProfileId};

use crate::db::RepositoryError;
use crate::services::{AccountError, AuthError, ChatError, StorageError, UserError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad input from the client.
    #[error("{0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// Not logged in, or bad credentials.
    #[error("{0}")]
    Unauthenticated(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Upstream(#[from] RepositoryError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Upstream(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for the 401 returned to anonymous callers.
    #[must_use]
    pub fn login_required() -> Self {
        Self::Unauthenticated("authentication required".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Repository(e) => Self::Upstream(e),
            ChatError::AdminNotAssigned
            | ChatError::UserNotFound
            | ChatError::ChatNotFound
            | ChatError::MessageNotFound => Self::NotFound(err.to_string()),
            ChatError::EmptyMessage | ChatError::ChatClosed | ChatError::InvalidStatus(_) => {
                Self::Validation(err.to_string())
            }
            ChatError::NotSender | ChatError::NotParticipant => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Repository(e) => Self::Upstream(e),
            AuthError::InvalidCredentials => Self::Unauthenticated(err.to_string()),
            AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) | AuthError::EmailTaken => {
                Self::Validation(err.to_string())
            }
            AuthError::PasswordHash => Self::Internal(err.to_string()),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Repository(e) => Self::Upstream(e),
            AccountError::NotFound | AccountError::OwnerNotFound => {
                Self::NotFound(err.to_string())
            }
            AccountError::InvalidAmount(_) | AccountError::InvalidAccountNumber => {
                Self::Validation(err.to_string())
            }
        }
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Repository(e) => Self::Upstream(e),
            UserError::Auth(e) => e.into(),
            UserError::Account(e) => e.into(),
            UserError::NotFound => Self::NotFound(err.to_string()),
            UserError::Invalid(msg) => Self::Validation(msg),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(_) => Self::Internal(err.to_string()),
            StorageError::TooLarge { .. }
            | StorageError::UnsupportedType(_)
            | StorageError::MissingFile => Self::Validation(err.to_string()),
        }
    }
}

impl From<InvalidVariant> for AppError {
    fn from(err: InvalidVariant) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::Validation(err.body_text())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

/// Set the Sentry user context after login.
pub fn set_sentry_user(profile_id: ProfileId, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(profile_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
