//! Cart repository for database operations.
//!
//! Carts are keyed by an opaque session identifier. Line mutations happen
//! inside the cart service's transaction, so most operations here take a
//! connection.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use tram_sach_core::{BookId, CartId, CartItemId, Vnd};

use super::RepositoryError;
use crate::models::{CartLine, CartSummary, CartView};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for cart lines joined with their book.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: i64,
    book_id: i64,
    quantity: i64,
    book_title: String,
    book_price: i64,
    book_image: Option<String>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let price = Vnd::new(row.book_price);
        let subtotal = price.checked_mul_qty(row.quantity).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("cart line {} subtotal overflows", row.id))
        })?;

        Ok(Self {
            id: CartItemId::new(row.id),
            book_id: BookId::new(row.book_id),
            quantity: row.quantity,
            book_title: row.book_title,
            book_price: price,
            book_image: row.book_image,
            subtotal,
        })
    }
}

/// Internal row type for the back-office cart listing.
#[derive(Debug, sqlx::FromRow)]
struct CartSummaryRow {
    id: i64,
    session_id: String,
    line_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartSummaryRow> for CartSummary {
    fn from(row: CartSummaryRow) -> Self {
        Self {
            id: CartId::new(row.id),
            session_id: row.session_id,
            line_count: row.line_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A cart line as stored, without book details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredLine {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub book_id: BookId,
    pub quantity: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct StoredLineRow {
    id: i64,
    cart_id: i64,
    book_id: i64,
    quantity: i64,
}

impl From<StoredLineRow> for StoredLine {
    fn from(row: StoredLineRow) -> Self {
        Self {
            id: CartItemId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            book_id: BookId::new(row.book_id),
            quantity: row.quantity,
        }
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

/// Find the cart for a session.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_cart_id(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<Option<CartId>, RepositoryError> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM carts WHERE session_id = ?")
        .bind(session_id)
        .fetch_optional(conn)
        .await?;
    Ok(id.map(CartId::new))
}

/// Get the cart for a session, creating it if needed, and mark it updated.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn upsert_cart(
    conn: &mut SqliteConnection,
    session_id: &str,
    at: DateTime<Utc>,
) -> Result<CartId, RepositoryError> {
    let id: i64 = sqlx::query_scalar(
        r"
        INSERT INTO carts (session_id, created_at, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT (session_id) DO UPDATE SET updated_at = excluded.updated_at
        RETURNING id
        ",
    )
    .bind(session_id)
    .bind(at)
    .bind(at)
    .fetch_one(conn)
    .await?;
    Ok(CartId::new(id))
}

/// Mark a session's cart updated. Returns whether the session has a cart.
///
/// As a write, this also takes the database write lock, so callers that
/// read and then modify the cart should issue it first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn touch_session(
    conn: &mut SqliteConnection,
    session_id: &str,
    at: DateTime<Utc>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE carts SET updated_at = ? WHERE session_id = ?")
        .bind(at)
        .bind(session_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Find the line for a book in a cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_line_for_book(
    conn: &mut SqliteConnection,
    cart_id: CartId,
    book_id: BookId,
) -> Result<Option<StoredLine>, RepositoryError> {
    let row = sqlx::query_as::<_, StoredLineRow>(
        "SELECT id, cart_id, book_id, quantity FROM cart_items WHERE cart_id = ? AND book_id = ?",
    )
    .bind(cart_id)
    .bind(book_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Into::into))
}

/// Find a line by ID, only if it belongs to the given session's cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_owned_line(
    conn: &mut SqliteConnection,
    item_id: CartItemId,
    session_id: &str,
) -> Result<Option<StoredLine>, RepositoryError> {
    let row = sqlx::query_as::<_, StoredLineRow>(
        r"
        SELECT ci.id, ci.cart_id, ci.book_id, ci.quantity
        FROM cart_items ci
        JOIN carts c ON c.id = ci.cart_id
        WHERE ci.id = ? AND c.session_id = ?
        ",
    )
    .bind(item_id)
    .bind(session_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Into::into))
}

/// Add a new line to a cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_line(
    conn: &mut SqliteConnection,
    cart_id: CartId,
    book_id: BookId,
    quantity: i64,
) -> Result<CartItemId, RepositoryError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO cart_items (cart_id, book_id, quantity) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(cart_id)
    .bind(book_id)
    .bind(quantity)
    .fetch_one(conn)
    .await?;
    Ok(CartItemId::new(id))
}

/// Set the quantity of a line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn set_line_quantity(
    conn: &mut SqliteConnection,
    item_id: CartItemId,
    quantity: i64,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE cart_items SET quantity = ? WHERE id = ?")
        .bind(quantity)
        .bind(item_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete_line(
    conn: &mut SqliteConnection,
    item_id: CartItemId,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM cart_items WHERE id = ?")
        .bind(item_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Delete a cart and, by cascade, its lines.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete_cart(conn: &mut SqliteConnection, cart_id: CartId) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM carts WHERE id = ?")
        .bind(cart_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Load the shopper's view of a session's cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if a total overflows.
pub async fn load_view(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<CartView, RepositoryError> {
    let Some(cart_id) = find_cart_id(&mut *conn, session_id).await? else {
        return Ok(CartView::empty(session_id));
    };

    let rows = sqlx::query_as::<_, CartLineRow>(
        r"
        SELECT ci.id, ci.book_id, ci.quantity,
               b.title AS book_title, b.price_vnd AS book_price, b.image_url AS book_image
        FROM cart_items ci
        JOIN books b ON b.id = ci.book_id
        WHERE ci.cart_id = ?
        ORDER BY ci.id
        ",
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await?;

    let items: Vec<CartLine> = rows
        .into_iter()
        .map(TryInto::try_into)
        .collect::<Result<_, _>>()?;

    let total = Vnd::checked_sum(items.iter().map(|line| line.subtotal))
        .ok_or_else(|| RepositoryError::DataCorruption("cart total overflows".to_owned()))?;
    let item_count = count_items(&items)?;

    Ok(CartView {
        id: Some(cart_id),
        session_id: session_id.to_owned(),
        items,
        item_count,
        total,
    })
}

/// Total copies across all lines.
fn count_items(items: &[CartLine]) -> Result<i64, RepositoryError> {
    items
        .iter()
        .try_fold(0_i64, |count, line| count.checked_add(line.quantity))
        .ok_or_else(|| RepositoryError::DataCorruption("cart item count overflows".to_owned()))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for cart reads and housekeeping.
pub struct CartRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Load the shopper's view of a session's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn view(&self, session_id: &str) -> Result<CartView, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_view(&mut conn, session_id).await
    }

    /// List every stored cart, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_summaries(&self) -> Result<Vec<CartSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartSummaryRow>(
            r"
            SELECT c.id, c.session_id, c.created_at, c.updated_at,
                   (SELECT COUNT(*) FROM cart_items ci WHERE ci.cart_id = c.id) AS line_count
            FROM carts c
            ORDER BY c.updated_at DESC, c.id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Delete carts not updated since `cutoff`. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_idle_since(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM carts WHERE updated_at < ?")
            .bind(cutoff)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, quantity: i64) -> CartLine {
        CartLine {
            id: CartItemId::new(id),
            book_id: BookId::new(id),
            quantity,
            book_title: format!("Sách {id}"),
            book_price: Vnd::new(1_000),
            book_image: None,
            subtotal: Vnd::new(1_000),
        }
    }

    #[test]
    fn test_count_items() {
        assert!(matches!(count_items(&[]), Ok(0)));
        assert!(matches!(count_items(&[line(1, 2), line(2, 3)]), Ok(5)));
        assert!(matches!(
            count_items(&[line(1, i64::MAX), line(2, 1)]),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
