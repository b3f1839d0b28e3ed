//! Cart models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tram_sach_core::{BookId, CartId, CartItemId, Vnd};

/// One line of a cart with the book details needed to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub book_id: BookId,
    pub quantity: i64,
    pub book_title: String,
    pub book_price: Vnd,
    pub book_image: Option<String>,
    pub subtotal: Vnd,
}

/// A cart as shown to the shopper.
///
/// An unknown session yields an empty view with `id: None` rather than an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub id: Option<CartId>,
    pub session_id: String,
    pub items: Vec<CartLine>,
    pub item_count: i64,
    pub total: Vnd,
}

impl CartView {
    /// The view for a session that has no cart.
    #[must_use]
    pub fn empty(session_id: &str) -> Self {
        Self {
            id: None,
            session_id: session_id.to_owned(),
            items: Vec::new(),
            item_count: 0,
            total: Vnd::ZERO,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Back-office summary of a stored cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub id: CartId,
    pub session_id: String,
    pub line_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
