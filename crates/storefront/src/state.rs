//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{info, warn};

use tram_sach_store::services::{CartRetention, CartService, CatalogNotifier, WebhookError};

use crate::config::StorefrontConfig;

/// How often the abandoned-cart sweep runs when retention is enabled.
const CART_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: SqlitePool,
    notifier: CatalogNotifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Client` if the webhook HTTP client cannot be built.
    pub fn new(config: StorefrontConfig, pool: SqlitePool) -> Result<Self, WebhookError> {
        let notifier = CatalogNotifier::from_config(config.webhook.clone())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                notifier,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
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

    /// Start the periodic abandoned-cart sweep.
    ///
    /// Does nothing when carts are kept forever.
    pub fn start_cart_purge(&self) {
        let retention = self.config().cart_retention;
        if retention == CartRetention::Forever {
            return;
        }

        let state = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CART_PURGE_INTERVAL);
            loop {
                interval.tick().await;
                match CartService::new(state.pool())
                    .purge_abandoned(retention, tram_sach_store::db::now())
                    .await
                {
                    Ok(0) => {}
                    Ok(purged) => info!(purged, "Purged abandoned carts"),
                    Err(e) => warn!(error = %e, "Abandoned cart purge failed"),
                }
            }
        });
    }
}
