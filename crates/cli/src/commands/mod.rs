//! Subcommand implementations.

pub mod admin;
pub mod carts;
pub mod migrate;

use secrecy::SecretString;
use sqlx::SqlitePool;
use thiserror::Error;

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A session store rejected its configuration.
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Account operation failed.
    #[error("{0}")]
    Auth(#[from] tram_sach_store::services::AuthError),

    /// Cart cleanup failed.
    #[error("{0}")]
    Cart(#[from] tram_sach_store::services::CartError),

    /// An argument was out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Open the shared database named by `DATABASE_URL`.
async fn connect() -> Result<SqlitePool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = tram_sach_store::create_pool(&SecretString::from(database_url)).await?;
    Ok(pool)
}
