//! Read-only view of shopping carts.

use axum::{Json, Router, extract::State, routing::get};

use tram_sach_store::db::CartRepository;
use tram_sach_store::models::CartSummary;

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Build the carts router.
pub fn router() -> Router<AppState> {
    Router::new().route("/admin/api/carts", get(index))
}

async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<CartSummary>>> {
    let carts = CartRepository::new(state.pool()).list_summaries().await?;
    Ok(Json(carts))
}
