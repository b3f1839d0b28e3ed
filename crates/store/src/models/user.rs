//! User account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tram_sach_core::{Email, UserId, UserRole};

/// A customer or admin account.
///
/// The password hash is never part of this type; repositories return it
/// separately where a credential check needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether this account may use the back-office.
    #[must_use]
    pub fn is_active_admin(&self) -> bool {
        self.is_active && self.role == UserRole::Admin
    }
}

/// Back-office edit of an account.
#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
}
