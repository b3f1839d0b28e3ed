//! Domain services.
//!
//! Services own transactions and cross-table rules; repositories in
//! [`crate::db`] stay single-purpose.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod import;
pub mod webhook;

pub use auth::{AuthError, AuthService, Registration};
pub use cart::{CartError, CartRetention, CartService};
pub use catalog::{CatalogError, CatalogService};
pub use checkout::{CheckoutError, CheckoutService, OrderNumbers, RandomOrderNumbers};
pub use import::{ImportError, ImportReport, ImportRow, ImportService};
pub use webhook::{CatalogNotifier, ProductAction, WebhookConfig, WebhookError, WebhookNotifier};
