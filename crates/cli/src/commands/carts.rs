//! Abandoned cart cleanup.
//!
//! ```bash
//! ts-cli carts purge --idle-days 30
//! ```

use tram_sach_store::db::now;
use tram_sach_store::services::{CartRetention, CartService};

use super::{CommandError, connect};

/// Delete carts untouched for `idle_days` days.
///
/// # Errors
///
/// Returns an error if `idle_days` is zero or the delete fails.
pub async fn purge(idle_days: u32) -> Result<u64, CommandError> {
    if idle_days == 0 {
        return Err(CommandError::InvalidArgument(
            "--idle-days must be at least 1".to_string(),
        ));
    }

    let pool = connect().await?;
    let retention = CartRetention::IdleFor(chrono::Duration::days(i64::from(idle_days)));

    let removed = CartService::new(&pool).purge_abandoned(retention, now()).await?;

    tracing::info!(removed, idle_days, "Abandoned carts purged");
    Ok(removed)
}
