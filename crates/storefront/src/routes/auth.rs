//! Customer account routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use tram_sach_store::models::User;
use tram_sach_store::services::{AuthError, AuthService, Registration};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Body of `POST /api/auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Create a customer account.
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool())
        .register(&Registration {
            email: &request.email,
            password: &request.password,
            full_name: request.full_name.as_deref(),
            phone: request.phone.as_deref(),
        })
        .await?;

    tracing::info!(user_id = %user.id, "Customer registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in and remember the customer in the session.
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login(&request.email, &request.password)
        .await?;

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(Json(user))
}

/// Forget the customer.
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in customer's account.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    match AuthService::new(state.pool()).get_user(current.id).await {
        Ok(user) if user.is_active => Ok(Json(user)),
        Ok(_) | Err(AuthError::UserNotFound) => {
            Err(AppError::Unauthorized("Not logged in".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
