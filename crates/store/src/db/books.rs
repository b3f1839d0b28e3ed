//! Book repository for database operations.
//!
//! Storefront reads only see active books; back-office reads pass
//! `include_inactive`. Inserts are exposed as a free function over a
//! connection so the bulk importer can run them inside its per-row
//! transaction.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use tram_sach_core::{BookId, CategoryId, Vnd};

use super::{RepositoryError, contains_pattern, now};
use crate::models::{Book, BookInput, BookListing, BookQuery, SearchResults};

/// Column list for `books b`.
macro_rules! book_columns {
    () => {
        "b.id, b.title, b.authors, b.description, b.price_vnd, b.stock, b.image_url, \
         b.rating_avg, b.pages, b.publisher, b.publish_year, b.is_active, b.category_id, \
         b.created_at"
    };
}

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for book queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BookRow {
    id: i64,
    title: String,
    authors: String,
    description: Option<String>,
    price_vnd: i64,
    stock: i64,
    image_url: Option<String>,
    rating_avg: f64,
    pages: Option<i64>,
    publisher: Option<String>,
    publish_year: Option<i64>,
    is_active: bool,
    category_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self {
            id: BookId::new(row.id),
            title: row.title,
            authors: row.authors,
            description: row.description,
            price_vnd: Vnd::new(row.price_vnd),
            stock: row.stock,
            image_url: row.image_url,
            rating_avg: row.rating_avg,
            pages: row.pages,
            publisher: row.publisher,
            publish_year: row.publish_year,
            is_active: row.is_active,
            category_id: row.category_id.map(CategoryId::new),
            created_at: row.created_at,
        }
    }
}

/// Internal row type for book queries joined with the category name.
#[derive(Debug, sqlx::FromRow)]
struct BookListingRow {
    #[sqlx(flatten)]
    book: BookRow,
    category_name: Option<String>,
}

impl From<BookListingRow> for BookListing {
    fn from(row: BookListingRow) -> Self {
        Self {
            book: row.book.into(),
            category_name: row.category_name,
        }
    }
}

/// Map constraint failures on book writes to repository errors.
fn map_write_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_foreign_key_violation() {
            return RepositoryError::Conflict("category does not exist".to_owned());
        }
        if db_err.is_check_violation() {
            return RepositoryError::Conflict("price and stock must not be negative".to_owned());
        }
    }
    RepositoryError::Database(e)
}

// =============================================================================
// Connection-level operations
// =============================================================================

/// Insert a book on an existing connection or transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the category does not exist.
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_book(
    conn: &mut SqliteConnection,
    input: &BookInput,
    created_at: DateTime<Utc>,
) -> Result<Book, RepositoryError> {
    let id: i64 = sqlx::query_scalar(
        r"
        INSERT INTO books (title, authors, description, price_vnd, stock, image_url,
                           rating_avg, pages, publisher, publish_year, is_active,
                           category_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        ",
    )
    .bind(input.title.trim())
    .bind(input.authors.trim())
    .bind(input.description.as_deref())
    .bind(input.price_vnd)
    .bind(input.stock)
    .bind(input.image_url.as_deref())
    .bind(input.rating_avg)
    .bind(input.pages)
    .bind(input.publisher.as_deref())
    .bind(input.publish_year)
    .bind(input.is_active)
    .bind(input.category_id)
    .bind(created_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_write_error)?;

    fetch_book(conn, BookId::new(id))
        .await?
        .ok_or(RepositoryError::NotFound)
}

/// Fetch one book on an existing connection or transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn fetch_book(
    conn: &mut SqliteConnection,
    id: BookId,
) -> Result<Option<Book>, RepositoryError> {
    let row = sqlx::query_as::<_, BookRow>(concat!(
        "SELECT ",
        book_columns!(),
        " FROM books b WHERE b.id = ?"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Take `quantity` copies out of stock if at least that many remain.
///
/// Returns `false`, changing nothing, when stock is short.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn decrement_stock(
    conn: &mut SqliteConnection,
    id: BookId,
    quantity: i64,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE books SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1")
        .bind(quantity)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for book database operations.
pub struct BookRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BookRepository<'a> {
    /// Create a new book repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a book by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_book(&mut conn, id).await
    }

    /// Get an active book with its category name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_listing(
        &self,
        id: BookId,
    ) -> Result<Option<BookListing>, RepositoryError> {
        let row = sqlx::query_as::<_, BookListingRow>(concat!(
            "SELECT ",
            book_columns!(),
            ", c.name AS category_name
             FROM books b LEFT JOIN categories c ON c.id = b.category_id
             WHERE b.id = ? AND b.is_active = 1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List active books, newest first, optionally within one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(
        &self,
        category_id: Option<CategoryId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookListing>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookListingRow>(concat!(
            "SELECT ",
            book_columns!(),
            ", c.name AS category_name
             FROM books b LEFT JOIN categories c ON c.id = b.category_id
             WHERE b.is_active = 1 AND (? IS NULL OR b.category_id = ?)
             ORDER BY b.created_at DESC, b.id DESC
             LIMIT ? OFFSET ?"
        ))
        .bind(category_id)
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Search the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &BookQuery) -> Result<SearchResults, RepositoryError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM books b WHERE 1 = 1");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(concat!(
            "SELECT ",
            book_columns!(),
            ", c.name AS category_name
             FROM books b LEFT JOIN categories c ON c.id = b.category_id
             WHERE 1 = 1"
        ));
        push_filters(&mut select, query);
        select.push(query.sort_by.order_by());
        select
            .push(" LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let rows: Vec<BookListingRow> = select.build_query_as().fetch_all(self.pool).await?;

        Ok(SearchResults {
            total,
            limit: query.limit,
            offset: query.offset,
            books: rows.into_iter().map(Into::into).collect(),
        })
    }

    /// Create a book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, input: &BookInput) -> Result<Book, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_book(&mut conn, input, now()).await
    }

    /// Replace every editable field of a book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book does not exist.
    /// Returns `RepositoryError::Conflict` if the category does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(&self, id: BookId, input: &BookInput) -> Result<Book, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            r"
            UPDATE books
            SET title = ?, authors = ?, description = ?, price_vnd = ?, stock = ?,
                image_url = ?, rating_avg = ?, pages = ?, publisher = ?,
                publish_year = ?, is_active = ?, category_id = ?
            WHERE id = ?
            ",
        )
        .bind(input.title.trim())
        .bind(input.authors.trim())
        .bind(input.description.as_deref())
        .bind(input.price_vnd)
        .bind(input.stock)
        .bind(input.image_url.as_deref())
        .bind(input.rating_avg)
        .bind(input.pages)
        .bind(input.publisher.as_deref())
        .bind(input.publish_year)
        .bind(input.is_active)
        .bind(input.category_id)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        fetch_book(&mut conn, id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a book, returning its last state.
    ///
    /// Order lines keep their history with `book_id` cleared; cart lines for
    /// the book are removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: BookId) -> Result<Book, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let book = fetch_book(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(book)
    }
}

/// Append `WHERE` clauses for a catalog query.
fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &BookQuery) {
    if !query.include_inactive {
        builder.push(" AND b.is_active = 1");
    }

    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = contains_pattern(q);
        builder
            .push(" AND (b.title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR b.authors LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR b.description LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if let Some(category_id) = query.category_id {
        builder.push(" AND b.category_id = ").push_bind(category_id);
    }

    if let Some(price_min) = query.price_min {
        builder.push(" AND b.price_vnd >= ").push_bind(price_min);
    }

    if let Some(price_max) = query.price_max {
        builder.push(" AND b.price_vnd <= ").push_bind(price_max);
    }

    if let Some(author) = query
        .author
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
    {
        builder
            .push(" AND b.authors LIKE ")
            .push_bind(contains_pattern(author))
            .push(" ESCAPE '\\'");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_support::test_db;
    use crate::models::BookSort;

    fn book(title: &str, authors: &str, price: i64) -> BookInput {
        BookInput {
            title: title.to_owned(),
            authors: authors.to_owned(),
            description: None,
            price_vnd: Vnd::new(price),
            stock: 10,
            image_url: None,
            rating_avg: 0.0,
            pages: None,
            publisher: None,
            publish_year: None,
            is_active: true,
            category_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let repo = BookRepository::new(&db.pool);

        let created = repo
            .create(&book("Nhà Giả Kim", "Paulo Coelho", 79_000))
            .await
            .unwrap();
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.price_vnd, Vnd::new(79_000));
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn test_unknown_category_is_conflict() {
        let db = test_db().await;
        let repo = BookRepository::new(&db.pool);

        let mut input = book("Orphan", "Nobody", 1_000);
        input.category_id = Some(CategoryId::new(999));

        assert!(matches!(
            repo.create(&input).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_search_filters_and_sorts() {
        let db = test_db().await;
        let repo = BookRepository::new(&db.pool);

        repo.create(&book("Rust in Action", "Tim McNamara", 500_000))
            .await
            .unwrap();
        repo.create(&book("Programming Rust", "Jim Blandy", 700_000))
            .await
            .unwrap();
        repo.create(&book("Cooking 101", "Chef", 100_000))
            .await
            .unwrap();
        let mut hidden = book("Rust Hidden", "Ghost", 10_000);
        hidden.is_active = false;
        repo.create(&hidden).await.unwrap();

        let results = repo
            .search(&BookQuery {
                q: Some("rust".to_owned()),
                sort_by: BookSort::PriceAsc,
                ..BookQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(results.total, 2);
        let titles: Vec<_> = results.books.iter().map(|b| b.book.title.as_str()).collect();
        assert_eq!(titles, ["Rust in Action", "Programming Rust"]);

        let results = repo
            .search(&BookQuery {
                price_max: Some(Vnd::new(500_000)),
                author: Some("mcnamara".to_owned()),
                ..BookQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(results.total, 1);

        let all = repo
            .search(&BookQuery {
                q: Some("rust".to_owned()),
                include_inactive: true,
                ..BookQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(all.total, 3);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let db = test_db().await;
        let repo = BookRepository::new(&db.pool);

        repo.create(&book("100% Hạnh phúc", "A", 1_000)).await.unwrap();
        repo.create(&book("1000 câu hỏi", "B", 1_000)).await.unwrap();

        let results = repo
            .search(&BookQuery {
                q: Some("100%".to_owned()),
                ..BookQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(results.total, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = test_db().await;
        let repo = BookRepository::new(&db.pool);

        let created = repo.create(&book("Draft", "A", 1_000)).await.unwrap();
        let mut edit = book("Final", "A", 2_000);
        edit.stock = 0;
        let updated = repo.update(created.id, &edit).await.unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.stock, 0);

        let deleted = repo.delete(created.id).await.unwrap();
        assert_eq!(deleted.title, "Final");
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(created.id).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
