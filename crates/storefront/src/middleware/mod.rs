//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `SQLite` store)

pub mod auth;
pub mod cart_session;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use cart_session::{
    CartSessionQuery, cart_session_or_create, current_cart_session, forget_cart_session,
};
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, session_store};
