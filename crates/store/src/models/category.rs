//! Category model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tram_sach_core::{CategoryId, is_valid_slug};

/// A book category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating or replacing a category.
///
/// When `slug` is omitted it is derived from the name.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CategoryInput {
    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("category name is required".to_owned());
        }
        if let Some(slug) = &self.slug
            && !is_valid_slug(slug)
        {
            return Err(format!("invalid slug: {slug}"));
        }
        Ok(())
    }
}
