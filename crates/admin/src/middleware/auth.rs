//! Authentication extractors for admin.
//!
//! The session only remembers who logged in. [`RequireAdminAuth`] looks the
//! account up again on every request, so demoting, deactivating or deleting
//! an admin takes effect immediately.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::warn;

use tram_sach_store::models::User;
use tram_sach_store::services::AuthService;

use crate::error::AppError;
use crate::models::{CurrentAdmin, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in, still-authorized admin.
///
/// Yields the current database record of the account.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdminAuth(admin): RequireAdminAuth) -> impl IntoResponse {
///     format!("Hello, {}!", admin.email)
/// }
/// ```
pub struct RequireAdminAuth(pub User);

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;

        let current: CurrentAdmin = session
            .get(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;

        let Some(user) = AuthService::new(state.pool())
            .verify_admin(current.id)
            .await?
        else {
            warn!(user_id = %current.id, "Admin session no longer authorized");
            if let Err(e) = session.flush().await {
                warn!(
                    user_id = %current.id,
                    error = %e,
                    "Failed to flush stale admin session"
                );
            }
            return Err(AppError::Unauthorized("Not logged in".to_string()));
        };

        Ok(Self(user))
    }
}

/// Store the signed-in admin in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// End the admin session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
