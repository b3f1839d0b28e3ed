//! Category repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use tram_sach_core::{CategoryId, slugify};

use super::{RepositoryError, is_unique_violation, now};
use crate::models::{Category, CategoryInput};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for category queries.
#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    description: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            image_url: row.image_url,
            created_at: row.created_at,
        }
    }
}

fn map_write_error(e: sqlx::Error) -> RepositoryError {
    if is_unique_violation(&e) {
        RepositoryError::Conflict("category name or slug already exists".to_owned())
    } else {
        RepositoryError::Database(e)
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

/// Find a category by exact (case-sensitive) name.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Category>, RepositoryError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, slug, description, image_url, created_at FROM categories WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Pick a slug for `name` that no category uses yet.
///
/// The plain slug is used when free. Otherwise a numeric suffix is appended,
/// starting at one more than the current number of categories and counting
/// up until an unused slug is found.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn unique_slug(conn: &mut SqliteConnection, name: &str) -> Result<String, RepositoryError> {
    let base = slugify(name);
    if !slug_taken(conn, &base).await? {
        return Ok(base);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(&mut *conn)
        .await?;

    let mut n = count + 1;
    loop {
        let candidate = format!("{base}-{n}");
        if !slug_taken(conn, &candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

async fn slug_taken(conn: &mut SqliteConnection, slug: &str) -> Result<bool, RepositoryError> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE slug = ?)")
        .bind(slug)
        .fetch_one(conn)
        .await?;
    Ok(taken)
}

/// Insert a category on an existing connection or transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the name or slug is taken.
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_category(
    conn: &mut SqliteConnection,
    input: &CategoryInput,
    slug: &str,
    created_at: DateTime<Utc>,
) -> Result<Category, RepositoryError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        r"
        INSERT INTO categories (name, slug, description, image_url, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, name, slug, description, image_url, created_at
        ",
    )
    .bind(input.name.trim())
    .bind(slug)
    .bind(input.description.as_deref())
    .bind(input.image_url.as_deref())
    .bind(created_at)
    .fetch_one(conn)
    .await
    .map_err(map_write_error)?;

    Ok(row.into())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List all categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description, image_url, created_at FROM categories ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description, image_url, created_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description, image_url, created_at FROM categories WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a category, deriving a unique slug when none is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or an explicit slug is taken.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let slug = match &input.slug {
            Some(slug) => slug.clone(),
            None => unique_slug(&mut tx, &input.name).await?,
        };
        let category = insert_category(&mut tx, input, &slug, now()).await?;

        tx.commit().await?;
        Ok(category)
    }

    /// Replace a category's fields.
    ///
    /// An omitted slug keeps the current one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            UPDATE categories
            SET name = ?, slug = COALESCE(?, slug), description = ?, image_url = ?
            WHERE id = ?
            RETURNING id, name, slug, description, image_url, created_at
            ",
        )
        .bind(input.name.trim())
        .bind(input.slug.as_deref())
        .bind(input.description.as_deref())
        .bind(input.image_url.as_deref())
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(map_write_error)?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete a category. Its books stay in the catalog without a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_support::test_db;

    fn input(name: &str) -> CategoryInput {
        CategoryInput {
            name: name.to_owned(),
            slug: None,
            description: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_derives_slug() {
        let db = test_db().await;
        let repo = CategoryRepository::new(&db.pool);

        let category = repo.create(&input("Văn Học")).await.unwrap();
        assert_eq!(category.slug, "van-hoc");
        assert_eq!(
            repo.get_by_slug("van-hoc").await.unwrap().unwrap().id,
            category.id
        );
    }

    #[tokio::test]
    async fn test_colliding_slug_gets_count_suffix() {
        let db = test_db().await;
        let repo = CategoryRepository::new(&db.pool);

        repo.create(&input("Kinh tế")).await.unwrap();
        repo.create(&input("Thiếu nhi")).await.unwrap();
        // Different name, same slug as "Kinh tế"; two categories exist.
        let clash = repo.create(&input("Kinh Tế")).await.unwrap();
        assert_eq!(clash.slug, "kinh-te-3");
    }

    #[tokio::test]
    async fn test_suffix_skips_taken_candidates() {
        let db = test_db().await;
        let repo = CategoryRepository::new(&db.pool);

        repo.create(&input("Sử")).await.unwrap();
        let mut explicit = input("Lịch sử thế giới");
        explicit.slug = Some("su-2".to_owned());
        repo.create(&explicit).await.unwrap();

        let clash = repo.create(&input("SỬ")).await.unwrap();
        assert_eq!(clash.slug, "su-3");
    }

    #[tokio::test]
    async fn test_duplicate_name_is_conflict() {
        let db = test_db().await;
        let repo = CategoryRepository::new(&db.pool);

        repo.create(&input("Khoa học")).await.unwrap();
        let mut dup = input("Khoa học");
        dup.slug = Some("khoa-hoc-khac".to_owned());
        assert!(matches!(
            repo.create(&dup).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_slug_when_omitted() {
        let db = test_db().await;
        let repo = CategoryRepository::new(&db.pool);

        let created = repo.create(&input("Tâm lý")).await.unwrap();
        let mut edit = input("Tâm lý học");
        edit.description = Some("Sách tâm lý".to_owned());
        let updated = repo.update(created.id, &edit).await.unwrap();

        assert_eq!(updated.name, "Tâm lý học");
        assert_eq!(updated.slug, "tam-ly");
        assert_eq!(updated.description.as_deref(), Some("Sách tâm lý"));
        assert!(matches!(
            repo.update(CategoryId::new(999), &edit).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
