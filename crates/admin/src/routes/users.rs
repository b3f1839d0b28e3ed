//! Account management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use tram_sach_core::UserId;
use tram_sach_store::db::UserRepository;
use tram_sach_store::models::{User, UserUpdate};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Filter for the user list.
#[derive(Debug, Deserialize)]
pub struct UserListParams {
    /// Matches email or full name.
    #[serde(default)]
    pub search: Option<String>,
}

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/api/users", get(index))
        .route(
            "/admin/api/users/{id}",
            get(show).put(update).delete(destroy),
        )
}

async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> Result<Json<Vec<User>>> {
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let users = UserRepository::new(state.pool()).list(search).await?;
    Ok(Json(users))
}

async fn show(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<User>> {
    UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// PUT /admin/api/users/{id}
///
/// Demoting or deactivating an admin ends their access on the next request.
#[instrument(skip(admin, state, changes), fields(admin_id = %admin.id))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(changes): Json<UserUpdate>,
) -> Result<Json<User>> {
    let user = UserRepository::new(state.pool()).update(id, &changes).await?;
    tracing::info!(user_id = %user.id, role = %user.role, is_active = user.is_active, "User updated");
    Ok(Json(user))
}

/// Orders placed by the account keep their history with no owner.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
async fn destroy(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    UserRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
