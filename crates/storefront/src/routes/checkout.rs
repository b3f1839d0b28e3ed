//! Checkout and receipt lookup.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use tram_sach_store::models::{CustomerInfo, OrderReceipt};
use tram_sach_store::services::{CheckoutError, CheckoutService};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{
    CartSessionQuery, OptionalAuth, current_cart_session, forget_cart_session,
};
use crate::state::AppState;

/// Body of `POST /api/checkout`.
///
/// `session_id` may be left out by browser clients; the cookie session's
/// cart is used instead.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub customer: CustomerInfo,
}

/// Place an order for the cart.
#[instrument(skip(state, session, auth, request))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderReceipt>)> {
    let CheckoutRequest {
        session_id,
        mut customer,
    } = request;

    let query = CartSessionQuery { session_id };
    let session_id = current_cart_session(&session, &query)
        .await
        .ok_or(CheckoutError::EmptyCart)?;

    if customer.user_id.is_none() {
        customer.user_id = auth.0.map(|user| user.id);
    }

    let receipt = CheckoutService::new(state.pool(), state.notifier())
        .checkout(&session_id, &customer)
        .await?;

    // The order is already committed
    if let Err(e) = forget_cart_session(&session, &session_id).await {
        warn!(error = %e, "Failed to clear cart session after checkout");
    }

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", receipt.order_number.as_str())]),
    );
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Look up an order's receipt by its public number.
#[instrument(skip(state))]
pub async fn order_by_number(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderReceipt>> {
    CheckoutService::new(state.pool(), state.notifier())
        .get_order_by_number(&order_number)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_request_accepts_flat_body() {
        let request: CheckoutRequest = serde_json::from_str(
            r#"{
                "session_id": "abc",
                "customer_name": "Trần Thị B",
                "customer_phone": "0912345678",
                "customer_address": "5 Hai Bà Trưng, Hà Nội",
                "payment_method": "bank_transfer"
            }"#,
        )
        .unwrap();

        assert_eq!(request.session_id.as_deref(), Some("abc"));
        assert_eq!(request.customer.customer_name, "Trần Thị B");
        assert_eq!(request.customer.payment_method(), "bank_transfer");
        assert_eq!(request.customer.shipping_method(), "standard");
        assert_eq!(request.customer.user_id, None);
    }
}
