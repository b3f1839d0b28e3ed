//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness check
//! GET    /health/ready                        - Readiness check (database)
//!
//! # Auth
//! POST   /admin/auth/login                    - Admin login
//! POST   /admin/auth/logout                   - Admin logout
//!
//! # Back-office API (admin session required)
//! GET    /admin/api/books                     - Books (?search, limit, offset)
//! POST   /admin/api/books                     - Create a book
//! GET    /admin/api/books/{id}                - Book detail
//! PUT    /admin/api/books/{id}                - Replace a book
//! DELETE /admin/api/books/{id}                - Delete a book
//! GET    /admin/api/categories                - Categories
//! POST   /admin/api/categories                - Create a category
//! GET    /admin/api/categories/{id}           - Category detail
//! PUT    /admin/api/categories/{id}           - Update a category
//! DELETE /admin/api/categories/{id}           - Delete a category
//! GET    /admin/api/orders                    - Orders (?search)
//! GET    /admin/api/orders/{id}               - Order detail
//! PUT    /admin/api/orders/{id}/status        - Set order status
//! DELETE /admin/api/orders/{id}               - Delete an order
//! GET    /admin/api/users                     - Accounts (?search)
//! GET    /admin/api/users/{id}                - Account detail
//! PUT    /admin/api/users/{id}                - Update an account
//! DELETE /admin/api/users/{id}                - Delete an account
//! GET    /admin/api/carts                     - Cart listing
//! POST   /admin/api/import-products           - Bulk CSV import (multipart)
//! ```

pub mod auth;
pub mod books;
pub mod carts;
pub mod categories;
pub mod import;
pub mod orders;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Create all routes for the admin.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(books::router())
        .merge(categories::router())
        .merge(orders::router())
        .merge(users::router())
        .merge(carts::router())
        .merge(import::router())
}
