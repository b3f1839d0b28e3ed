//! Back-office book mutations.
//!
//! Each change is announced to the catalog webhook once it has committed.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, instrument};

use tram_sach_core::BookId;

use crate::db::{BookRepository, RepositoryError};
use crate::models::{Book, BookInput};
use crate::services::webhook::{CatalogNotifier, ProductAction};

/// Errors from book mutations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Book create, update and delete with change notification.
pub struct CatalogService<'a> {
    books: BookRepository<'a>,
    notifier: &'a CatalogNotifier,
}

impl<'a> CatalogService<'a> {
    /// Create a catalog service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, notifier: &'a CatalogNotifier) -> Self {
        Self {
            books: BookRepository::new(pool),
            notifier,
        }
    }

    /// Add a book and announce it as `create`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the input is invalid.
    /// Returns `CatalogError::Repository` if the category is unknown or the
    /// insert fails.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_book(&self, input: &BookInput) -> Result<Book, CatalogError> {
        input.validate().map_err(CatalogError::Validation)?;
        let book = self.books.create(input).await?;

        info!(book_id = %book.id, "Book created");
        self.notifier
            .product_changed(ProductAction::Create, book.clone());
        Ok(book)
    }

    /// Replace a book's fields and announce it as `update`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the input is invalid.
    /// Returns `CatalogError::Repository` with `NotFound` if the book does not exist.
    #[instrument(skip(self, input))]
    pub async fn update_book(&self, id: BookId, input: &BookInput) -> Result<Book, CatalogError> {
        input.validate().map_err(CatalogError::Validation)?;
        let book = self.books.update(id, input).await?;

        info!("Book updated");
        self.notifier
            .product_changed(ProductAction::Update, book.clone());
        Ok(book)
    }

    /// Delete a book and announce its last state as `delete`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` with `NotFound` if the book does not exist.
    #[instrument(skip(self))]
    pub async fn delete_book(&self, id: BookId) -> Result<Book, CatalogError> {
        let book = self.books.delete(id).await?;

        info!("Book deleted");
        self.notifier
            .product_changed(ProductAction::Delete, book.clone());
        Ok(book)
    }
}
