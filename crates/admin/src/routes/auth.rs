//! Back-office login and logout.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use tram_sach_store::models::User;
use tram_sach_store::services::AuthService;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Body of `POST /admin/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/auth/login", post(login))
        .route("/admin/auth/logout", post(logout))
}

/// Log in to the back-office.
///
/// POST /admin/auth/login
#[instrument(skip(state, session, request), fields(email = %request.email))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login_admin(&request.email, &request.password)
        .await?;

    set_current_admin(&session, &CurrentAdmin::from(&user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(Json(user))
}

/// Logout and clear session.
///
/// POST /admin/auth/logout
async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}
