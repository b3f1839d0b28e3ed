//! Cart route handlers.
//!
//! Every handler answers with the full cart view so clients can re-render
//! without a second request.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use tram_sach_core::{BookId, CartItemId};
use tram_sach_store::models::CartView;
use tram_sach_store::services::{CartError, CartService};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{CartSessionQuery, cart_session_or_create, current_cart_session};
use crate::state::AppState;

const fn default_quantity() -> i64 {
    1
}

/// Body of `POST /api/cart/add`.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub book_id: BookId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

/// Body of `PUT /api/cart/item/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// Show the cart. Unknown or missing sessions get an empty cart.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CartSessionQuery>,
) -> Result<Json<CartView>> {
    let Some(session_id) = current_cart_session(&session, &query).await else {
        return Ok(Json(CartView::empty("")));
    };

    let view = CartService::new(state.pool()).get_cart(&session_id).await?;
    Ok(Json(view))
}

/// Add copies of a book, starting a cart session if needed.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CartSessionQuery>,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let session_id = cart_session_or_create(&session, &query).await?;

    let view = CartService::new(state.pool())
        .add_item(&session_id, request.book_id, request.quantity)
        .await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("book_id", &request.book_id.to_string())]),
    );
    Ok(Json(view))
}

/// Change a line's quantity; zero or less removes it.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<CartItemId>,
    Query(query): Query<CartSessionQuery>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    let session_id = current_cart_session(&session, &query)
        .await
        .ok_or(CartError::MissingSession)?;

    let view = CartService::new(state.pool())
        .update_item_quantity(item_id, &session_id, request.quantity)
        .await?;
    Ok(Json(view))
}

/// Remove a line.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<CartItemId>,
    Query(query): Query<CartSessionQuery>,
) -> Result<Json<CartView>> {
    let session_id = current_cart_session(&session, &query)
        .await
        .ok_or(CartError::MissingSession)?;

    let view = CartService::new(state.pool())
        .remove_item(item_id, &session_id)
        .await?;
    Ok(Json(view))
}
