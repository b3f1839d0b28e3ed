//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use tram_sach_core::{BookId, CategoryId};
use tram_sach_store::db::{BookRepository, CategoryRepository};
use tram_sach_store::models::book::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use tram_sach_store::models::{BookListing, Category};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Listing filters for `GET /api/products`.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// List active books, newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<BookListing>>> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) || offset < 0 {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE} and offset must not be negative"
        )));
    }

    let books = BookRepository::new(state.pool())
        .list_active(params.category_id, limit, offset)
        .await?;
    Ok(Json(books))
}

/// Show one active book.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<Json<BookListing>> {
    BookRepository::new(state.pool())
        .get_active_listing(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
}

/// List all categories by name.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool()).list_all().await?;
    Ok(Json(categories))
}

/// Look up a category by slug.
#[instrument(skip(state))]
pub async fn category_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
}
