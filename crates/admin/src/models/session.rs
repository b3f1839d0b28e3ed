//! Session-related types for admin authentication.

use serde::{Deserialize, Serialize};

use tram_sach_core::{Email, UserId};
use tram_sach_store::models::User;

/// Session-stored admin identity.
///
/// Only identifies the account; role and active flag are re-read from the
/// database on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's user ID.
    pub id: UserId,
    /// Admin's email address.
    pub email: Email,
}

impl From<&User> for CurrentAdmin {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
