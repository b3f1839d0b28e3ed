//! Session middleware configuration for admin.
//!
//! Admin sessions use their own table in the shared database and stricter
//! cookie settings than the storefront (SameSite=Strict, 24h expiry).

use sqlx::SqlitePool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::AdminConfig;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "ts_admin_session";

/// Table holding admin sessions.
pub const SESSION_TABLE_NAME: &str = "admin_sessions";

/// Session expiry time in seconds (24 hours - stricter than storefront).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// The admin session store. Its table is created by `ts-cli migrate`.
///
/// # Errors
///
/// Returns the store's message if the table name is rejected.
pub fn session_store(pool: &SqlitePool) -> Result<SqliteStore, String> {
    SqliteStore::new(pool.clone()).with_table_name(SESSION_TABLE_NAME)
}

/// Create the session layer around `store`.
#[must_use]
pub fn create_session_layer(
    store: SqliteStore,
    config: &AdminConfig,
) -> SessionManagerLayer<SqliteStore> {
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
