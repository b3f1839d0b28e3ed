//! Catalog search.

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use tram_sach_store::db::BookRepository;
use tram_sach_store::models::{BookQuery, SearchResults};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Search active books.
///
/// Accepts `q`, `category_id`, `price_min`, `price_max`, `author`,
/// `sort_by` (`newest`, `price_asc`, `price_desc`, `rating`), `limit` and
/// `offset`.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(mut query): Query<BookQuery>,
) -> Result<Json<SearchResults>> {
    query.validate().map_err(AppError::BadRequest)?;
    query.include_inactive = false;

    let results = BookRepository::new(state.pool()).search(&query).await?;
    Ok(Json(results))
}
