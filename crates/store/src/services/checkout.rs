//! Checkout: turn a session's cart into an order.
//!
//! The whole conversion runs in one transaction. Its first statement writes
//! to the cart, so concurrent checkouts serialize on the database write lock
//! and each sees the stock the previous one left behind. Stock is taken with
//! a conditional decrement; if any line comes up short the transaction rolls
//! back and nothing changes.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use tram_sach_core::{BookId, OrderNumber, Vnd};

use crate::db::books::{decrement_stock, fetch_book};
use crate::db::carts::{delete_cart, load_view, touch_session};
use crate::db::orders::{NewOrder, insert_order, insert_order_item};
use crate::db::users::user_exists;
use crate::db::{OrderRepository, RepositoryError, is_unique_violation, now};
use crate::models::{Book, CustomerInfo, OrderReceipt};
use crate::services::webhook::{CatalogNotifier, ProductAction};

/// How many order numbers to try before giving up.
pub const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A required field was blank.
    #[error("{0}")]
    Validation(String),

    /// The session has no cart or the cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A line asks for more copies than remain.
    #[error("insufficient stock for \"{title}\": requested {requested}, available {available}")]
    InsufficientStock {
        book_id: BookId,
        title: String,
        requested: i64,
        available: i64,
    },

    /// A line refers to a book that is no longer for sale.
    #[error("\"{title}\" is no longer available")]
    BookUnavailable { book_id: BookId, title: String },

    /// The order total does not fit in the money type.
    #[error("order total is too large")]
    TotalOverflow,

    /// Every generated order number was already taken.
    #[error("could not allocate a unique order number")]
    OrderNumberExhausted,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Source of candidate order numbers.
pub trait OrderNumbers: Send + Sync {
    /// Produce a candidate for an order placed on `date`.
    fn next(&self, date: NaiveDate) -> OrderNumber;
}

/// Random `ORD-YYYYMMDD-XXXXXX` numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOrderNumbers;

impl OrderNumbers for RandomOrderNumbers {
    fn next(&self, date: NaiveDate) -> OrderNumber {
        OrderNumber::generate(date, &mut rand::rng())
    }
}

static RANDOM_ORDER_NUMBERS: RandomOrderNumbers = RandomOrderNumbers;

/// A cart line priced against the book's current state.
struct PricedLine {
    book: Book,
    quantity: i64,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a SqlitePool,
    notifier: &'a CatalogNotifier,
    order_numbers: &'a dyn OrderNumbers,
}

impl<'a> CheckoutService<'a> {
    /// Create a checkout service using random order numbers.
    #[must_use]
    pub fn new(pool: &'a SqlitePool, notifier: &'a CatalogNotifier) -> Self {
        Self {
            pool,
            notifier,
            order_numbers: &RANDOM_ORDER_NUMBERS,
        }
    }

    /// Use a different order number source.
    #[must_use]
    pub fn with_order_numbers(mut self, order_numbers: &'a dyn OrderNumbers) -> Self {
        self.order_numbers = order_numbers;
        self
    }

    /// Place an order for everything in the session's cart.
    ///
    /// On success the order and its lines exist, each book's stock has gone
    /// down by the quantity bought and the cart is gone. On any error none
    /// of that has happened.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` if a contact field is blank or
    /// `user_id` names no account.
    /// Returns `CheckoutError::EmptyCart` if there is nothing to buy.
    /// Returns `CheckoutError::BookUnavailable` if a book was deactivated.
    /// Returns `CheckoutError::InsufficientStock` if a line exceeds stock.
    /// Returns `CheckoutError::OrderNumberExhausted` if no unique number was found.
    #[instrument(skip(self, customer), fields(session_id = %session_id))]
    pub async fn checkout(
        &self,
        session_id: &str,
        customer: &CustomerInfo,
    ) -> Result<OrderReceipt, CheckoutError> {
        if session_id.trim().is_empty() {
            return Err(CheckoutError::Validation("session_id is required".to_owned()));
        }
        customer.validate().map_err(CheckoutError::Validation)?;

        let created_at = now();
        let mut tx = self.pool.begin().await?;

        if !touch_session(&mut tx, session_id, created_at).await? {
            return Err(CheckoutError::EmptyCart);
        }

        if let Some(user_id) = customer.user_id
            && !user_exists(&mut tx, user_id).await?
        {
            return Err(CheckoutError::Validation(format!(
                "user_id {user_id} does not exist"
            )));
        }

        let cart = load_view(&mut tx, session_id).await?;
        let Some(cart_id) = cart.id.filter(|_| !cart.is_empty()) else {
            return Err(CheckoutError::EmptyCart);
        };

        let mut lines = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let book = fetch_book(&mut tx, item.book_id)
                .await?
                .filter(|book| book.is_active)
                .ok_or_else(|| CheckoutError::BookUnavailable {
                    book_id: item.book_id,
                    title: item.book_title.clone(),
                })?;

            if item.quantity > book.stock {
                return Err(CheckoutError::InsufficientStock {
                    book_id: book.id,
                    title: book.title,
                    requested: item.quantity,
                    available: book.stock,
                });
            }

            lines.push(PricedLine {
                book,
                quantity: item.quantity,
            });
        }

        let subtotals = lines
            .iter()
            .map(|line| line.book.price_vnd.checked_mul_qty(line.quantity))
            .collect::<Option<Vec<_>>>()
            .ok_or(CheckoutError::TotalOverflow)?;
        let total = Vnd::checked_sum(subtotals).ok_or(CheckoutError::TotalOverflow)?;

        let date = created_at.date_naive();
        let mut placed = None;
        for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
            let order_number = self.order_numbers.next(date);
            let header = NewOrder {
                order_number: &order_number,
                session_id,
                user_id: customer.user_id,
                customer_name: &customer.customer_name,
                customer_phone: &customer.customer_phone,
                customer_address: &customer.customer_address,
                shipping_method: customer.shipping_method(),
                payment_method: customer.payment_method(),
                total,
                created_at,
            };

            match insert_order(&mut tx, &header).await {
                Ok(order_id) => {
                    placed = Some((order_id, order_number));
                    break;
                }
                Err(e) if is_unique_violation(&e) => {
                    warn!(attempt, order_number = %order_number, "Order number collision");
                }
                Err(e) => return Err(e.into()),
            }
        }
        let (order_id, order_number) = placed.ok_or(CheckoutError::OrderNumberExhausted)?;

        let mut changed = Vec::with_capacity(lines.len());
        for line in lines {
            insert_order_item(
                &mut tx,
                order_id,
                line.book.id,
                line.quantity,
                line.book.price_vnd,
            )
            .await?;

            if !decrement_stock(&mut tx, line.book.id, line.quantity).await? {
                return Err(CheckoutError::InsufficientStock {
                    book_id: line.book.id,
                    title: line.book.title,
                    requested: line.quantity,
                    available: line.book.stock,
                });
            }

            if let Some(book) = fetch_book(&mut tx, line.book.id).await? {
                changed.push(book);
            }
        }

        delete_cart(&mut tx, cart_id).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            order_number = %order_number,
            total = %total,
            "Order placed"
        );

        for book in changed {
            self.notifier.product_changed(ProductAction::Update, book);
        }

        Ok(OrderReceipt {
            order_id,
            order_number,
            total,
            customer_name: customer.customer_name.trim().to_owned(),
            created_at,
        })
    }

    /// Look up an order by its number, for the order confirmation page.
    ///
    /// Anyone holding the number can ask, so only the receipt comes back:
    /// no contact details and no cart session.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the query fails.
    pub async fn get_order_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderReceipt>, CheckoutError> {
        let detail = OrderRepository::new(self.pool)
            .get_by_number(order_number)
            .await?;
        Ok(detail.map(OrderReceipt::from))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use tram_sach_core::{OrderStatus, UserId};

    use super::*;
    use crate::db::BookRepository;
    use crate::db::test_support::{seed_book, test_db};
    use crate::models::BookInput;
    use crate::services::cart::CartService;

    fn customer() -> CustomerInfo {
        CustomerInfo {
            customer_name: "  Trần Thị B ".to_owned(),
            customer_phone: "0912345678".to_owned(),
            customer_address: "45 Nguyễn Huệ, Quận 1".to_owned(),
            shipping_method: None,
            payment_method: None,
            user_id: None,
        }
    }

    /// Hands out a fixed sequence of order numbers.
    struct Scripted(Mutex<Vec<&'static str>>);

    impl Scripted {
        fn new(numbers: &[&'static str]) -> Self {
            Self(Mutex::new(numbers.iter().rev().copied().collect()))
        }
    }

    impl OrderNumbers for Scripted {
        fn next(&self, _date: NaiveDate) -> OrderNumber {
            let next = self.0.lock().unwrap().pop().unwrap();
            OrderNumber::from_string(next.to_owned())
        }
    }

    async fn stock_of(pool: &SqlitePool, id: BookId) -> i64 {
        BookRepository::new(pool)
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    #[tokio::test]
    async fn test_checkout_places_order() {
        let db = test_db().await;
        let notifier = CatalogNotifier::disabled();
        let a = seed_book(&db.pool, "A", 100_000, 5).await;
        let b = seed_book(&db.pool, "B", 50_000, 1).await;

        let carts = CartService::new(&db.pool);
        carts.add_item("s1", a.id, 2).await.unwrap();
        carts.add_item("s1", b.id, 1).await.unwrap();

        let service = CheckoutService::new(&db.pool, &notifier);
        let receipt = service.checkout("s1", &customer()).await.unwrap();

        assert_eq!(receipt.total, Vnd::new(250_000));
        assert_eq!(receipt.customer_name, "Trần Thị B");
        assert!(receipt.order_number.as_str().starts_with("ORD-"));
        assert_eq!(receipt.order_number.as_str().len(), 19);

        assert_eq!(stock_of(&db.pool, a.id).await, 3);
        assert_eq!(stock_of(&db.pool, b.id).await, 0);
        assert_eq!(carts.get_cart("s1").await.unwrap().id, None);

        let looked_up = service
            .get_order_by_number(receipt.order_number.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(looked_up, receipt);

        let detail = OrderRepository::new(&db.pool)
            .get_by_number(receipt.order_number.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.order.id, receipt.order_id);
        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.order.shipping_method, "standard");
        assert_eq!(detail.order.payment_method, "cod");
        assert_eq!(detail.items.len(), 2);
        let sum = Vnd::checked_sum(detail.items.iter().map(|l| l.subtotal)).unwrap();
        assert_eq!(sum, detail.order.total);
    }

    #[tokio::test]
    async fn test_empty_and_missing_carts() {
        let db = test_db().await;
        let notifier = CatalogNotifier::disabled();
        let book = seed_book(&db.pool, "A", 10_000, 5).await;
        let service = CheckoutService::new(&db.pool, &notifier);

        assert!(matches!(
            service.checkout("ghost", &customer()).await,
            Err(CheckoutError::EmptyCart)
        ));

        let carts = CartService::new(&db.pool);
        let view = carts.add_item("emptied", book.id, 1).await.unwrap();
        carts.remove_item(view.items[0].id, "emptied").await.unwrap();

        assert!(matches!(
            service.checkout("emptied", &customer()).await,
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_blank_fields_are_rejected() {
        let db = test_db().await;
        let notifier = CatalogNotifier::disabled();
        let service = CheckoutService::new(&db.pool, &notifier);

        let mut info = customer();
        info.customer_phone = "  ".to_owned();
        let err = service.checkout("s", &info).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(ref m) if m == "customer_phone is required"));
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected_and_cart_kept() {
        let db = test_db().await;
        let notifier = CatalogNotifier::disabled();
        let book = seed_book(&db.pool, "A", 10_000, 3).await;
        let carts = CartService::new(&db.pool);
        carts.add_item("s", book.id, 1).await.unwrap();

        let service = CheckoutService::new(&db.pool, &notifier);
        let mut info = customer();
        info.user_id = Some(UserId::new(9999));
        let err = service.checkout("s", &info).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(ref m) if m.contains("9999")));

        assert_eq!(carts.get_cart("s").await.unwrap().items.len(), 1);
        assert_eq!(stock_of(&db.pool, book.id).await, 3);
    }

    #[tokio::test]
    async fn test_stock_shortfall_changes_nothing() {
        let db = test_db().await;
        let notifier = CatalogNotifier::disabled();
        let a = seed_book(&db.pool, "A", 10_000, 5).await;
        let b = seed_book(&db.pool, "B", 10_000, 2).await;

        let carts = CartService::new(&db.pool);
        carts.add_item("s", a.id, 3).await.unwrap();
        carts.add_item("s", b.id, 2).await.unwrap();

        // Another channel sells one copy of B after it was carted.
        let mut input = BookInput {
            title: b.title.clone(),
            authors: b.authors.clone(),
            description: None,
            price_vnd: b.price_vnd,
            stock: 1,
            image_url: None,
            rating_avg: 0.0,
            pages: None,
            publisher: None,
            publish_year: None,
            is_active: true,
            category_id: None,
        };
        BookRepository::new(&db.pool)
            .update(b.id, &input)
            .await
            .unwrap();

        let service = CheckoutService::new(&db.pool, &notifier);
        let err = service.checkout("s", &customer()).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            }
        ));

        assert_eq!(stock_of(&db.pool, a.id).await, 5);
        assert_eq!(stock_of(&db.pool, b.id).await, 1);
        assert_eq!(carts.get_cart("s").await.unwrap().items.len(), 2);
        assert!(OrderRepository::new(&db.pool).list(None).await.unwrap().is_empty());

        input.is_active = false;
        input.stock = 10;
        BookRepository::new(&db.pool)
            .update(b.id, &input)
            .await
            .unwrap();
        assert!(matches!(
            service.checkout("s", &customer()).await,
            Err(CheckoutError::BookUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_order_number_collision_retries() {
        let db = test_db().await;
        let notifier = CatalogNotifier::disabled();
        let book = seed_book(&db.pool, "A", 10_000, 10).await;
        let carts = CartService::new(&db.pool);

        let first = Scripted::new(&["ORD-20250101-AAAAAA"]);
        carts.add_item("one", book.id, 1).await.unwrap();
        CheckoutService::new(&db.pool, &notifier)
            .with_order_numbers(&first)
            .checkout("one", &customer())
            .await
            .unwrap();

        let second = Scripted::new(&["ORD-20250101-AAAAAA", "ORD-20250101-BBBBBB"]);
        carts.add_item("two", book.id, 1).await.unwrap();
        let receipt = CheckoutService::new(&db.pool, &notifier)
            .with_order_numbers(&second)
            .checkout("two", &customer())
            .await
            .unwrap();
        assert_eq!(receipt.order_number.as_str(), "ORD-20250101-BBBBBB");

        let taken = Scripted::new(&["ORD-20250101-AAAAAA"; ORDER_NUMBER_ATTEMPTS]);
        carts.add_item("three", book.id, 1).await.unwrap();
        let err = CheckoutService::new(&db.pool, &notifier)
            .with_order_numbers(&taken)
            .checkout("three", &customer())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::OrderNumberExhausted));
        assert_eq!(stock_of(&db.pool, book.id).await, 8);
        assert_eq!(carts.get_cart("three").await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_order_keeps_price_paid() {
        let db = test_db().await;
        let notifier = CatalogNotifier::disabled();
        let book = seed_book(&db.pool, "A", 10_000, 10).await;
        CartService::new(&db.pool)
            .add_item("s", book.id, 2)
            .await
            .unwrap();

        let service = CheckoutService::new(&db.pool, &notifier);
        let receipt = service.checkout("s", &customer()).await.unwrap();

        let input = BookInput {
            title: book.title.clone(),
            authors: book.authors.clone(),
            description: None,
            price_vnd: Vnd::new(99_000),
            stock: 8,
            image_url: None,
            rating_avg: 0.0,
            pages: None,
            publisher: None,
            publish_year: None,
            is_active: true,
            category_id: None,
        };
        BookRepository::new(&db.pool)
            .update(book.id, &input)
            .await
            .unwrap();

        let detail = OrderRepository::new(&db.pool)
            .get_by_number(receipt.order_number.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.items[0].price_vnd, Vnd::new(10_000));
        assert_eq!(detail.order.total, Vnd::new(20_000));

        BookRepository::new(&db.pool).delete(book.id).await.unwrap();
        let detail = OrderRepository::new(&db.pool)
            .get_by_number(receipt.order_number.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.items[0].book_id, None);
        assert_eq!(detail.items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_for_last_copy() {
        let db = test_db().await;
        let notifier = CatalogNotifier::disabled();
        let book = seed_book(&db.pool, "Last", 10_000, 1).await;

        let carts = CartService::new(&db.pool);
        carts.add_item("left", book.id, 1).await.unwrap();
        carts.add_item("right", book.id, 1).await.unwrap();

        let service = CheckoutService::new(&db.pool, &notifier);
        let info = customer();
        let (left, right) = tokio::join!(
            service.checkout("left", &info),
            service.checkout("right", &info)
        );

        let successes = [&left, &right].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let failure = if left.is_err() { left } else { right };
        assert!(matches!(
            failure,
            Err(CheckoutError::InsufficientStock { available: 0, .. })
        ));
        assert_eq!(stock_of(&db.pool, book.id).await, 0);
    }
}
