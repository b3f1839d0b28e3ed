//! Cart service.
//!
//! Every mutation validates against the book's stock at that moment and
//! commits immediately. Stock is not reserved: a cart that was valid when
//! filled can still fail at checkout.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, instrument};

use tram_sach_core::{BookId, CartItemId};

use crate::db::books::fetch_book;
use crate::db::carts::{
    delete_line, find_line_for_book, find_owned_line, insert_line, load_view, set_line_quantity,
    touch_session, upsert_cart,
};
use crate::db::{CartRepository, RepositoryError, now};
use crate::models::CartView;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// No session identifier was supplied.
    #[error("session id is required")]
    MissingSession,

    /// Quantity to add was below one.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// The book does not exist or is not for sale.
    #[error("book not found")]
    BookNotFound,

    /// The line does not exist in this session's cart.
    #[error("cart item not found")]
    ItemNotFound,

    /// The requested quantity exceeds the book's stock.
    #[error("insufficient stock for \"{title}\": requested {requested}, available {available}")]
    InsufficientStock {
        book_id: BookId,
        title: String,
        requested: i64,
        available: i64,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// How long an untouched cart is kept.
///
/// Nothing expires carts on its own; [`CartService::purge_abandoned`]
/// applies the policy when something (the CLI, a scheduler) calls it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CartRetention {
    /// Keep carts until checkout.
    #[default]
    Forever,
    /// Delete carts not updated for this long.
    IdleFor(Duration),
}

impl CartRetention {
    /// Carts last updated before the returned instant are abandoned.
    #[must_use]
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Forever => None,
            Self::IdleFor(idle) => now.checked_sub_signed(idle),
        }
    }
}

/// Cart operations keyed by session identifier.
pub struct CartService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Add `quantity` copies of a book, merging with an existing line.
    ///
    /// Creates the cart on first use.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity < 1`.
    /// Returns `CartError::BookNotFound` if the book is missing or inactive.
    /// Returns `CartError::InsufficientStock` if the merged quantity exceeds stock.
    #[instrument(skip(self), fields(session_id = %session_id, book_id = %book_id))]
    pub async fn add_item(
        &self,
        session_id: &str,
        book_id: BookId,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        require_session(session_id)?;
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        let mut tx = self.pool.begin().await?;

        // Write first so the transaction holds the lock for the stock check.
        let cart_id = upsert_cart(&mut tx, session_id, now()).await?;

        let book = fetch_book(&mut tx, book_id)
            .await?
            .filter(|book| book.is_active)
            .ok_or(CartError::BookNotFound)?;

        let existing = find_line_for_book(&mut tx, cart_id, book_id).await?;
        let merged = existing
            .map_or(0, |line| line.quantity)
            .checked_add(quantity)
            .ok_or(CartError::InvalidQuantity)?;

        if merged > book.stock {
            return Err(CartError::InsufficientStock {
                book_id,
                title: book.title,
                requested: merged,
                available: book.stock,
            });
        }

        match existing {
            Some(line) => set_line_quantity(&mut tx, line.id, merged).await?,
            None => {
                insert_line(&mut tx, cart_id, book_id, merged).await?;
            }
        }

        let view = load_view(&mut tx, session_id).await?;
        tx.commit().await?;

        debug!(quantity = merged, "Cart line updated");
        Ok(view)
    }

    /// Get the cart for a session. Unknown sessions get an empty view.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn get_cart(&self, session_id: &str) -> Result<CartView, CartError> {
        Ok(CartRepository::new(self.pool).view(session_id).await?)
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` unless the session's cart owns the line.
    /// Returns `CartError::InsufficientStock` if `quantity` exceeds stock; the
    /// line is left unchanged.
    #[instrument(skip(self), fields(session_id = %session_id, item_id = %item_id))]
    pub async fn update_item_quantity(
        &self,
        item_id: CartItemId,
        session_id: &str,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        require_session(session_id)?;

        let mut tx = self.pool.begin().await?;
        if !touch_session(&mut tx, session_id, now()).await? {
            return Err(CartError::ItemNotFound);
        }

        let line = find_owned_line(&mut tx, item_id, session_id)
            .await?
            .ok_or(CartError::ItemNotFound)?;

        if quantity <= 0 {
            delete_line(&mut tx, line.id).await?;
        } else {
            let book = fetch_book(&mut tx, line.book_id)
                .await?
                .ok_or(CartError::ItemNotFound)?;

            if quantity > book.stock {
                return Err(CartError::InsufficientStock {
                    book_id: book.id,
                    title: book.title,
                    requested: quantity,
                    available: book.stock,
                });
            }
            set_line_quantity(&mut tx, line.id, quantity).await?;
        }

        let view = load_view(&mut tx, session_id).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` unless the session's cart owns the line.
    #[instrument(skip(self), fields(session_id = %session_id, item_id = %item_id))]
    pub async fn remove_item(
        &self,
        item_id: CartItemId,
        session_id: &str,
    ) -> Result<CartView, CartError> {
        require_session(session_id)?;

        let mut tx = self.pool.begin().await?;
        if !touch_session(&mut tx, session_id, now()).await? {
            return Err(CartError::ItemNotFound);
        }

        let line = find_owned_line(&mut tx, item_id, session_id)
            .await?
            .ok_or(CartError::ItemNotFound)?;
        delete_line(&mut tx, line.id).await?;

        let view = load_view(&mut tx, session_id).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Delete carts the retention policy considers abandoned.
    ///
    /// Returns the number of carts removed; always zero for
    /// [`CartRetention::Forever`].
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    #[instrument(skip(self))]
    pub async fn purge_abandoned(
        &self,
        retention: CartRetention,
        now: DateTime<Utc>,
    ) -> Result<u64, CartError> {
        let Some(cutoff) = retention.cutoff(now) else {
            debug!("Cart retention is unlimited, nothing to purge");
            return Ok(0);
        };

        let removed = CartRepository::new(self.pool)
            .delete_idle_since(cutoff)
            .await?;
        info!(removed, cutoff = %cutoff, "Purged abandoned carts");
        Ok(removed)
    }
}

fn require_session(session_id: &str) -> Result<(), CartError> {
    if session_id.trim().is_empty() {
        return Err(CartError::MissingSession);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tram_sach_core::Vnd;

    use super::*;
    use crate::db::BookRepository;
    use crate::db::test_support::{seed_book, test_db};

    #[tokio::test]
    async fn test_unknown_session_gets_empty_cart() {
        let db = test_db().await;
        let carts = CartService::new(&db.pool);

        for _ in 0..2 {
            let view = carts.get_cart("nobody").await.unwrap();
            assert!(view.is_empty());
            assert_eq!(view.id, None);
            assert_eq!(view.total, Vnd::ZERO);
        }
    }

    #[tokio::test]
    async fn test_add_creates_cart_and_computes_totals() {
        let db = test_db().await;
        let a = seed_book(&db.pool, "A", 100_000, 5).await;
        let b = seed_book(&db.pool, "B", 50_000, 1).await;
        let carts = CartService::new(&db.pool);

        carts.add_item("s1", a.id, 2).await.unwrap();
        let view = carts.add_item("s1", b.id, 1).await.unwrap();

        assert!(view.id.is_some());
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.total, Vnd::new(250_000));
        assert_eq!(view.items[0].book_title, "A");
        assert_eq!(view.items[0].subtotal, Vnd::new(200_000));
    }

    #[tokio::test]
    async fn test_adds_merge_into_one_line() {
        let db = test_db().await;
        let book = seed_book(&db.pool, "Merge", 10_000, 10).await;
        let carts = CartService::new(&db.pool);

        carts.add_item("split", book.id, 2).await.unwrap();
        let split = carts.add_item("split", book.id, 3).await.unwrap();
        let single = carts.add_item("single", book.id, 5).await.unwrap();

        assert_eq!(split.items.len(), 1);
        assert_eq!(split.items[0].quantity, 5);
        assert_eq!(split.total, single.total);
    }

    #[tokio::test]
    async fn test_merged_quantity_is_checked_against_stock() {
        let db = test_db().await;
        let book = seed_book(&db.pool, "Scarce", 10_000, 3).await;
        let carts = CartService::new(&db.pool);

        carts.add_item("s", book.id, 2).await.unwrap();
        let err = carts.add_item("s", book.id, 2).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::InsufficientStock {
                requested: 4,
                available: 3,
                ..
            }
        ));
        assert_eq!(carts.get_cart("s").await.unwrap().items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let db = test_db().await;
        let book = seed_book(&db.pool, "Hidden", 10_000, 3).await;
        let carts = CartService::new(&db.pool);

        assert!(matches!(
            carts.add_item("s", book.id, 0).await,
            Err(CartError::InvalidQuantity)
        ));
        assert!(matches!(
            carts.add_item("s", BookId::new(999), 1).await,
            Err(CartError::BookNotFound)
        ));
        assert!(matches!(
            carts.add_item("", book.id, 1).await,
            Err(CartError::MissingSession)
        ));

        let mut input = crate::models::BookInput {
            title: book.title.clone(),
            authors: book.authors.clone(),
            description: None,
            price_vnd: book.price_vnd,
            stock: book.stock,
            image_url: None,
            rating_avg: 0.0,
            pages: None,
            publisher: None,
            publish_year: None,
            is_active: true,
            category_id: None,
        };
        input.is_active = false;
        BookRepository::new(&db.pool)
            .update(book.id, &input)
            .await
            .unwrap();

        assert!(matches!(
            carts.add_item("s", book.id, 1).await,
            Err(CartError::BookNotFound)
        ));
        // The failed add must not leave an empty cart behind.
        assert_eq!(carts.get_cart("s").await.unwrap().id, None);
    }

    #[tokio::test]
    async fn test_update_quantity() {
        let db = test_db().await;
        let book = seed_book(&db.pool, "Q", 20_000, 4).await;
        let carts = CartService::new(&db.pool);

        let view = carts.add_item("s", book.id, 1).await.unwrap();
        let item_id = view.items[0].id;

        let view = carts.update_item_quantity(item_id, "s", 4).await.unwrap();
        assert_eq!(view.items[0].quantity, 4);
        assert_eq!(view.total, Vnd::new(80_000));

        let err = carts.update_item_quantity(item_id, "s", 5).await.unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { .. }));
        assert_eq!(carts.get_cart("s").await.unwrap().items[0].quantity, 4);

        let view = carts.update_item_quantity(item_id, "s", 0).await.unwrap();
        assert!(view.is_empty());
        assert!(view.id.is_some());
    }

    #[tokio::test]
    async fn test_other_sessions_cannot_touch_lines() {
        let db = test_db().await;
        let book = seed_book(&db.pool, "Mine", 20_000, 4).await;
        let carts = CartService::new(&db.pool);

        let view = carts.add_item("owner", book.id, 1).await.unwrap();
        let item_id = view.items[0].id;
        carts.add_item("intruder", book.id, 1).await.unwrap();

        assert!(matches!(
            carts.update_item_quantity(item_id, "intruder", 2).await,
            Err(CartError::ItemNotFound)
        ));
        assert!(matches!(
            carts.remove_item(item_id, "intruder").await,
            Err(CartError::ItemNotFound)
        ));
        assert!(matches!(
            carts.remove_item(item_id, "stranger").await,
            Err(CartError::ItemNotFound)
        ));

        let view = carts.remove_item(item_id, "owner").await.unwrap();
        assert!(view.is_empty());
    }

    #[tokio::test]
    async fn test_purge_abandoned() {
        let db = test_db().await;
        let book = seed_book(&db.pool, "Old", 20_000, 4).await;
        let carts = CartService::new(&db.pool);
        carts.add_item("stale", book.id, 1).await.unwrap();

        let retention = CartRetention::IdleFor(Duration::days(30));
        assert_eq!(
            carts
                .purge_abandoned(CartRetention::Forever, now() + Duration::days(365))
                .await
                .unwrap(),
            0
        );
        assert_eq!(carts.purge_abandoned(retention, now()).await.unwrap(), 0);
        assert_eq!(
            carts
                .purge_abandoned(retention, now() + Duration::days(31))
                .await
                .unwrap(),
            1
        );
        assert_eq!(carts.get_cart("stale").await.unwrap().id, None);
    }
}
