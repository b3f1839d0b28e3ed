//! Order repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use tram_sach_core::{BookId, OrderId, OrderItemId, OrderNumber, OrderStatus, UserId, Vnd};

use super::{RepositoryError, contains_pattern};
use crate::models::{Order, OrderDetail, OrderLine};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for order headers.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    session_id: String,
    user_id: Option<i64>,
    customer_name: String,
    customer_phone: String,
    customer_address: String,
    shipping_method: String,
    payment_method: String,
    total_vnd: i64,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            order_number: OrderNumber::from_string(row.order_number),
            session_id: row.session_id,
            user_id: row.user_id.map(UserId::new),
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_address: row.customer_address,
            shipping_method: row.shipping_method,
            payment_method: row.payment_method,
            total: Vnd::new(row.total_vnd),
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// Internal row type for order lines joined with the current book title.
#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: i64,
    book_id: Option<i64>,
    book_title: Option<String>,
    quantity: i64,
    price_vnd: i64,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let price = Vnd::new(row.price_vnd);
        let subtotal = price.checked_mul_qty(row.quantity).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("order line {} subtotal overflows", row.id))
        })?;

        Ok(Self {
            id: OrderItemId::new(row.id),
            book_id: row.book_id.map(BookId::new),
            book_title: row.book_title,
            quantity: row.quantity,
            price_vnd: price,
            subtotal,
        })
    }
}

/// Column list for `orders`.
macro_rules! order_columns {
    () => {
        "id, order_number, session_id, user_id, customer_name, customer_phone, \
         customer_address, shipping_method, payment_method, total_vnd, status, created_at"
    };
}

/// Header fields for a new order.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub order_number: &'a OrderNumber,
    pub session_id: &'a str,
    pub user_id: Option<UserId>,
    pub customer_name: &'a str,
    pub customer_phone: &'a str,
    pub customer_address: &'a str,
    pub shipping_method: &'a str,
    pub payment_method: &'a str,
    pub total: Vnd,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Connection-level operations
// =============================================================================

/// Insert an order header in `pending` status.
///
/// Returns the raw sqlx error so callers can detect an order-number
/// collision and retry.
///
/// # Errors
///
/// Returns `sqlx::Error` if the insert fails.
pub async fn insert_order(
    conn: &mut SqliteConnection,
    order: &NewOrder<'_>,
) -> Result<OrderId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r"
        INSERT INTO orders (order_number, session_id, user_id, customer_name, customer_phone,
                            customer_address, shipping_method, payment_method, total_vnd,
                            status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        ",
    )
    .bind(order.order_number)
    .bind(order.session_id)
    .bind(order.user_id)
    .bind(order.customer_name.trim())
    .bind(order.customer_phone.trim())
    .bind(order.customer_address.trim())
    .bind(order.shipping_method)
    .bind(order.payment_method)
    .bind(order.total)
    .bind(OrderStatus::Pending)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;

    Ok(OrderId::new(id))
}

/// Insert one order line with its frozen unit price.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order_item(
    conn: &mut SqliteConnection,
    order_id: OrderId,
    book_id: BookId,
    quantity: i64,
    price: Vnd,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO order_items (order_id, book_id, quantity, price_vnd) VALUES (?, ?, ?, ?)")
        .bind(order_id)
        .bind(book_id)
        .bind(quantity)
        .bind(price)
        .execute(conn)
        .await?;
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    async fn with_lines(&self, row: Option<OrderRow>) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let order: Order = row.into();

        let lines = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT oi.id, oi.book_id, b.title AS book_title, oi.quantity, oi.price_vnd
            FROM order_items oi
            LEFT JOIN books b ON b.id = oi.book_id
            WHERE oi.order_id = ?
            ORDER BY oi.id
            ",
        )
        .bind(order.id)
        .fetch_all(self.pool)
        .await?;

        let items = lines
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<_, _>>()?;

        Ok(Some(OrderDetail { order, items }))
    }

    /// Get an order with its lines by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        self.with_lines(row).await
    }

    /// Get an order with its lines by order number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE order_number = ?"
        ))
        .bind(order_number)
        .fetch_optional(self.pool)
        .await?;

        self.with_lines(row).await
    }

    /// Get an order with its lines, only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        self.with_lines(row).await
    }

    /// List a customer's orders, newest first, with their lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderDetail>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(detail) = self.with_lines(Some(row)).await? {
                orders.push(detail);
            }
        }
        Ok(orders)
    }

    /// List all orders, newest first, optionally matching order number,
    /// customer name or phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Order>, RepositoryError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);

        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            r" FROM orders
               WHERE ?1 IS NULL
                  OR order_number LIKE ?1 ESCAPE '\'
                  OR customer_name LIKE ?1 ESCAPE '\'
                  OR customer_phone LIKE ?1 ESCAPE '\'
               ORDER BY created_at DESC, id DESC"
        ))
        .bind(pattern)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "UPDATE orders SET status = ? WHERE id = ? RETURNING ",
            order_columns!()
        ))
        .bind(status)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete an order and its lines. Stock is not restored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
