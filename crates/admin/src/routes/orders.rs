//! Order management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use tracing::instrument;

use tram_sach_core::{OrderId, OrderStatus};
use tram_sach_store::db::OrderRepository;
use tram_sach_store::models::{Order, OrderDetail};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Filter for the order list.
#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    /// Matches order number, customer name or phone.
    #[serde(default)]
    pub search: Option<String>,
}

/// Body of `PUT /admin/api/orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/api/orders", get(index))
        .route("/admin/api/orders/{id}", get(show).delete(destroy))
        .route("/admin/api/orders/{id}/status", put(update_status))
}

/// Orders, newest first.
async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> Result<Json<Vec<Order>>> {
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let orders = OrderRepository::new(state.pool()).list(search).await?;
    Ok(Json(orders))
}

async fn show(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    OrderRepository::new(state.pool())
        .get_detail(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
async fn update_status(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .update_status(id, body.status)
        .await?;

    tracing::info!(order_number = %order.order_number, status = %order.status, "Order status changed");
    Ok(Json(order))
}

/// Items go with the order; stock is not restored.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
async fn destroy(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    OrderRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
