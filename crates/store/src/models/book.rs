//! Book model and catalog queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tram_sach_core::{BookId, CategoryId, Vnd};

/// Default page size for catalog listings.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub authors: String,
    pub description: Option<String>,
    pub price_vnd: Vnd,
    pub stock: i64,
    pub image_url: Option<String>,
    pub rating_avg: f64,
    pub pages: Option<i64>,
    pub publisher: Option<String>,
    pub publish_year: Option<i64>,
    pub is_active: bool,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
}

/// A book together with its category name, as listed in the storefront.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookListing {
    #[serde(flatten)]
    pub book: Book,
    pub category_name: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Fields for creating or fully replacing a book.
#[derive(Debug, Clone, Deserialize)]
pub struct BookInput {
    pub title: String,
    pub authors: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_vnd: Vnd,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub rating_avg: f64,
    #[serde(default)]
    pub pages: Option<i64>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub publish_year: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl BookInput {
    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".to_owned());
        }
        if self.authors.trim().is_empty() {
            return Err("authors is required".to_owned());
        }
        if self.price_vnd.is_negative() {
            return Err("price_vnd must not be negative".to_owned());
        }
        if self.stock < 0 {
            return Err("stock must not be negative".to_owned());
        }
        if !self.rating_avg.is_finite() || !(0.0..=5.0).contains(&self.rating_avg) {
            return Err("rating_avg must be between 0 and 5".to_owned());
        }
        if self.pages.is_some_and(|p| p <= 0) {
            return Err("pages must be positive".to_owned());
        }
        Ok(())
    }
}

/// Sort order for catalog search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
}

impl BookSort {
    pub(crate) const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => " ORDER BY b.created_at DESC, b.id DESC",
            Self::PriceAsc => " ORDER BY b.price_vnd ASC, b.id ASC",
            Self::PriceDesc => " ORDER BY b.price_vnd DESC, b.id DESC",
            Self::Rating => " ORDER BY b.rating_avg DESC, b.id DESC",
        }
    }
}

const fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Catalog search and listing filters.
///
/// `q` matches title, authors or description; `author` matches authors
/// only. Matching is a case-insensitive substring test (ASCII case folding).
#[derive(Debug, Clone, Deserialize)]
pub struct BookQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub price_min: Option<Vnd>,
    #[serde(default)]
    pub price_max: Option<Vnd>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub sort_by: BookSort,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    /// Include inactive books (back-office only).
    #[serde(skip)]
    pub include_inactive: bool,
}

impl Default for BookQuery {
    fn default() -> Self {
        Self {
            q: None,
            category_id: None,
            price_min: None,
            price_max: None,
            author: None,
            sort_by: BookSort::default(),
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
            include_inactive: false,
        }
    }
}

impl BookQuery {
    /// Check paging bounds.
    ///
    /// # Errors
    ///
    /// Returns a message when `limit` is outside `1..=100` or `offset` is negative.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.limit) {
            return Err(format!("limit must be between 1 and {MAX_PAGE_SIZE}"));
        }
        if self.offset < 0 {
            return Err("offset must not be negative".to_owned());
        }
        Ok(())
    }
}

/// One page of search results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub books: Vec<BookListing>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> BookInput {
        BookInput {
            title: "Dế Mèn phiêu lưu ký".to_owned(),
            authors: "Tô Hoài".to_owned(),
            description: None,
            price_vnd: Vnd::new(45_000),
            stock: 3,
            image_url: None,
            rating_avg: 4.5,
            pages: Some(144),
            publisher: None,
            publish_year: Some(1941),
            is_active: true,
            category_id: None,
        }
    }

    #[test]
    fn test_valid_input() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_stock_and_price() {
        let mut book = input();
        book.stock = -1;
        assert!(book.validate().is_err());

        let mut book = input();
        book.price_vnd = Vnd::new(-1);
        assert!(book.validate().is_err());
    }

    #[test]
    fn test_rejects_blank_title() {
        let mut book = input();
        book.title = "   ".to_owned();
        assert_eq!(book.validate().unwrap_err(), "title is required");
    }

    #[test]
    fn test_query_bounds() {
        let mut query = BookQuery::default();
        assert!(query.validate().is_ok());
        query.limit = 0;
        assert!(query.validate().is_err());
        query.limit = 101;
        assert!(query.validate().is_err());
        query.limit = 100;
        query.offset = -1;
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_sort_names() {
        let sort: BookSort = serde_json::from_str("\"price_desc\"").unwrap();
        assert_eq!(sort, BookSort::PriceDesc);
    }
}
