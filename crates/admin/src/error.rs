//! Unified error handling with Sentry integration.
//!
//! All admin handlers return `Result<T, AppError>`; failures become a JSON
//! body `{"code": ..., "message": ...}`. Server errors are captured to
//! Sentry and their details withheld from the client.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use tram_sach_store::RepositoryError;
use tram_sach_store::services::{AuthError, CatalogError, ImportError};

/// Application-level error type for admin.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Book mutation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The upload was rejected as a whole.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// The multipart body could not be read.
    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Not logged in, or no longer allowed in.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Database(err)
            | Self::Auth(AuthError::Repository(err))
            | Self::Catalog(CatalogError::Repository(err)) => match err {
                RepositoryError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
                RepositoryError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
            },
            Self::Auth(err) => match err {
                AuthError::UserAlreadyExists => (StatusCode::CONFLICT, "conflict"),
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "validation_error")
                }
                AuthError::PasswordHash | AuthError::Repository(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
                _ => (StatusCode::UNAUTHORIZED, "unauthorized"),
            },
            Self::Catalog(_) | Self::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            Self::Import(err) => match err {
                ImportError::TooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "file_too_large"),
                ImportError::UnsupportedFormat => {
                    (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format")
                }
                ImportError::Header(_) | ImportError::Malformed { .. } => {
                    (StatusCode::BAD_REQUEST, "invalid_file")
                }
            },
            Self::Multipart(err) => (err.status(), "invalid_upload"),
            Self::Session(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
        }
    }

    fn public_message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            return "Internal server error".to_string();
        }

        match self {
            // Every login failure looks the same from outside
            Self::Auth(
                AuthError::InvalidCredentials
                | AuthError::AccountDisabled
                | AuthError::NotAdmin
                | AuthError::UserNotFound,
            ) => "Invalid credentials".to_string(),
            Self::Auth(err) => err.to_string(),
            Self::Database(RepositoryError::NotFound)
            | Self::Catalog(CatalogError::Repository(RepositoryError::NotFound)) => {
                "Not found".to_string()
            }
            Self::Database(err) | Self::Catalog(CatalogError::Repository(err)) => err.to_string(),
            Self::Catalog(err) => err.to_string(),
            Self::Import(err) => err.to_string(),
            Self::Multipart(err) => err.body_text(),
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            code,
            message: self.public_message(status),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in admin.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AuthError::NotAdmin.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(ImportError::TooLarge.into()),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            get_status(ImportError::UnsupportedFormat.into()),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            get_status(CatalogError::Validation("stock must not be negative".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CatalogError::Repository(RepositoryError::NotFound).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("name".into()).into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_login_failures_share_one_message() {
        for err in [
            AuthError::InvalidCredentials,
            AuthError::AccountDisabled,
            AuthError::NotAdmin,
        ] {
            let err = AppError::from(err);
            let (status, _) = err.status_and_code();
            assert_eq!(err.public_message(status), "Invalid credentials");
        }
    }
}
