//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (add unique ID to each request)
//! 4. Body limit (import uploads)
//! 5. Session layer (tower-sessions with `SQLite` store)
//! 6. Auth guard ([`RequireAdminAuth`] on every `/admin/api` handler)

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{RequireAdminAuth, clear_current_admin, set_current_admin};
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, session_store};
