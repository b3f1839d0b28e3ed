//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                  - Liveness check
//! GET    /health/ready                            - Readiness check (database)
//!
//! # Catalog
//! GET    /api/products                            - Active books (?category_id, limit, offset)
//! GET    /api/products/{id}                       - Book detail
//! GET    /api/products/categories/all             - Category list
//! GET    /api/products/categories/by-slug/{slug}  - Category by slug
//! GET    /api/search                              - Search and filter
//!
//! # Cart (?session_id, or the cookie session)
//! GET    /api/cart                                - Cart view
//! POST   /api/cart/add                            - Add a book
//! PUT    /api/cart/item/{id}                      - Set a line's quantity
//! DELETE /api/cart/item/{id}                      - Remove a line
//!
//! # Checkout
//! POST   /api/checkout                            - Place an order
//! GET    /api/checkout/order/{order_number}       - Receipt lookup
//!
//! # Accounts
//! POST   /api/auth/register                       - Register
//! POST   /api/auth/login                          - Login
//! POST   /api/auth/logout                         - Logout
//! GET    /api/auth/me                             - Current customer
//! GET    /api/orders                              - Order history (requires auth)
//! GET    /api/orders/{id}                         - Order detail (requires auth)
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod search;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/categories/all", get(products::categories))
        .route("/categories/by-slug/{slug}", get(products::category_by_slug))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/item/{id}", put(cart::update).delete(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::checkout))
        .route("/order/{order_number}", get(checkout::order_by_number))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the order history routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/products", product_routes())
        .route("/api/search", get(search::search))
        .nest("/api/cart", cart_routes())
        .nest("/api/checkout", checkout_routes())
        .nest("/api/auth", auth_routes())
        .nest("/api/orders", order_routes())
}
