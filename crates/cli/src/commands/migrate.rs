//! Database migration command.
//!
//! Applies the embedded schema migrations, then creates the session tables
//! for the storefront and the admin. Servers never migrate on start-up.
//!
//! ```bash
//! ts-cli migrate
//! ```

use tower_sessions_sqlx_store::SqliteStore;

use super::{CommandError, connect};

/// Run all migrations against `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if the database cannot be reached or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running schema migrations...");
    tram_sach_store::migrate(&pool).await?;

    tracing::info!("Creating session tables...");
    let storefront: SqliteStore = tram_sach_storefront::middleware::session_store(&pool);
    storefront.migrate().await?;

    let admin = tram_sach_admin::middleware::session_store(&pool)
        .map_err(CommandError::SessionStore)?;
    admin.migrate().await?;

    tracing::info!("Migrations complete");
    Ok(())
}
