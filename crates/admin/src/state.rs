//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;
use thiserror::Error;
use tower_sessions_sqlx_store::SqliteStore;

use tram_sach_store::services::{CatalogNotifier, WebhookError};

use crate::config::AdminConfig;
use crate::middleware::session::session_store;

/// Error building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("webhook client: {0}")]
    Webhook(#[from] WebhookError),
    #[error("session store: {0}")]
    SessionStore(String),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: SqlitePool,
    notifier: CatalogNotifier,
    sessions: SqliteStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the webhook client or session store cannot be built.
    pub fn new(config: AdminConfig, pool: SqlitePool) -> Result<Self, StateError> {
        let notifier = CatalogNotifier::from_config(config.webhook.clone())?;
        let sessions = session_store(&pool).map_err(StateError::SessionStore)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                notifier,
                sessions,
            }),
        })
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the catalog change notifier.
    #[must_use]
    pub fn notifier(&self) -> &CatalogNotifier {
        &self.inner.notifier
    }

    /// Get the admin session store.
    #[must_use]
    pub fn sessions(&self) -> &SqliteStore {
        &self.inner.sessions
    }
}
