//! Order models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tram_sach_core::{BookId, OrderId, OrderItemId, OrderNumber, OrderStatus, UserId, Vnd};

/// Default shipping method.
pub const DEFAULT_SHIPPING_METHOD: &str = "standard";

/// Default payment method (cash on delivery).
pub const DEFAULT_PAYMENT_METHOD: &str = "cod";

/// An order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub session_id: String,
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub shipping_method: String,
    pub payment_method: String,
    pub total: Vnd,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// One line of a placed order.
///
/// `book_id` and `book_title` become `None` once the book is deleted; the
/// line keeps its quantity and the price paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub id: OrderItemId,
    pub book_id: Option<BookId>,
    pub book_title: Option<String>,
    pub quantity: i64,
    pub price_vnd: Vnd,
    pub subtotal: Vnd,
}

/// An order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>,
}

/// Shipping and contact details supplied at checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInfo {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl CustomerInfo {
    /// Check that contact fields are present.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first blank field.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("customer_name", &self.customer_name),
            ("customer_phone", &self.customer_phone),
            ("customer_address", &self.customer_address),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }
        Ok(())
    }

    /// Shipping method, falling back to the default.
    #[must_use]
    pub fn shipping_method(&self) -> &str {
        self.shipping_method
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_SHIPPING_METHOD)
    }

    /// Payment method, falling back to the default.
    #[must_use]
    pub fn payment_method(&self) -> &str {
        self.payment_method
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_PAYMENT_METHOD)
    }
}

/// What checkout hands back to the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub total: Vnd,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<OrderDetail> for OrderReceipt {
    fn from(detail: OrderDetail) -> Self {
        let order = detail.order;
        Self {
            order_id: order.id,
            order_number: order.order_number,
            total: order.total,
            customer_name: order.customer_name,
            created_at: order.created_at,
        }
    }
}
