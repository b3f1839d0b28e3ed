//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error response carries a JSON body `{"code": ..., "message": ...}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use tram_sach_store::RepositoryError;
use tram_sach_store::services::{AuthError, CartError, CheckoutError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
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
            Self::Database(err) => repository_status(err),
            Self::Cart(err) => match err {
                CartError::MissingSession | CartError::InvalidQuantity => {
                    (StatusCode::BAD_REQUEST, "validation_error")
                }
                CartError::BookNotFound | CartError::ItemNotFound => {
                    (StatusCode::NOT_FOUND, "not_found")
                }
                CartError::InsufficientStock { .. } => (StatusCode::CONFLICT, "insufficient_stock"),
                CartError::Repository(err) => repository_status(err),
            },
            Self::Checkout(err) => match err {
                CheckoutError::Validation(_) | CheckoutError::TotalOverflow => {
                    (StatusCode::BAD_REQUEST, "validation_error")
                }
                CheckoutError::EmptyCart => (StatusCode::BAD_REQUEST, "empty_cart"),
                CheckoutError::InsufficientStock { .. } => {
                    (StatusCode::CONFLICT, "insufficient_stock")
                }
                CheckoutError::BookUnavailable { .. } => (StatusCode::CONFLICT, "book_unavailable"),
                CheckoutError::OrderNumberExhausted => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
                CheckoutError::Repository(err) => repository_status(err),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials
                | AuthError::AccountDisabled
                | AuthError::NotAdmin
                | AuthError::UserNotFound => (StatusCode::UNAUTHORIZED, "unauthorized"),
                AuthError::UserAlreadyExists => (StatusCode::CONFLICT, "conflict"),
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "validation_error")
                }
                AuthError::Repository(err) => repository_status(err),
                AuthError::PasswordHash => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
            Self::Session(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        }
    }

    /// Message safe to show the client.
    fn public_message(&self, status: StatusCode) -> String {
        // Don't expose internal error details to clients
        if status.is_server_error() {
            return "Internal server error".to_string();
        }

        match self {
            Self::Database(err)
            | Self::Cart(CartError::Repository(err))
            | Self::Checkout(CheckoutError::Repository(err))
            | Self::Auth(AuthError::Repository(err)) => match err {
                RepositoryError::NotFound => "Not found".to_string(),
                other => other.to_string(),
            },
            Self::Cart(err) => err.to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound | AuthError::NotAdmin => {
                    "Invalid credentials".to_string()
                }
                AuthError::AccountDisabled => "Account is disabled".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                _ => "Authentication error".to_string(),
            },
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

fn repository_status(err: &RepositoryError) -> (StatusCode, &'static str) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        RepositoryError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Capture server errors to Sentry
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

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
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

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
