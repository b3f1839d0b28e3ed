//! Book management.
//!
//! Create, update and delete go through the catalog service so the chatbot
//! webhook hears about every committed change.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use tram_sach_core::BookId;
use tram_sach_store::db::BookRepository;
use tram_sach_store::models::book::MAX_PAGE_SIZE;
use tram_sach_store::models::{Book, BookInput, BookQuery, SearchResults};
use tram_sach_store::services::CatalogService;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Filters for the book list.
#[derive(Debug, Deserialize)]
pub struct BookListParams {
    /// Matches title or authors.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Build the books router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/api/books", get(index).post(create))
        .route(
            "/admin/api/books/{id}",
            get(show).put(update).delete(destroy),
        )
}

/// GET /admin/api/books
#[instrument(skip(_admin, state))]
async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(params): Query<BookListParams>,
) -> Result<Json<SearchResults>> {
    let query = BookQuery {
        q: params.search,
        limit: params.limit.unwrap_or(MAX_PAGE_SIZE),
        offset: params.offset.unwrap_or(0),
        include_inactive: true,
        ..BookQuery::default()
    };
    query.validate().map_err(AppError::BadRequest)?;

    let results = BookRepository::new(state.pool()).search(&query).await?;
    Ok(Json(results))
}

/// GET /admin/api/books/{id}
async fn show(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<Json<Book>> {
    BookRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
}

/// POST /admin/api/books
#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(input): Json<BookInput>,
) -> Result<(StatusCode, Json<Book>)> {
    let book = CatalogService::new(state.pool(), state.notifier())
        .create_book(&input)
        .await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /admin/api/books/{id}
#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<BookId>,
    Json(input): Json<BookInput>,
) -> Result<Json<Book>> {
    let book = CatalogService::new(state.pool(), state.notifier())
        .update_book(id, &input)
        .await?;
    Ok(Json(book))
}

/// DELETE /admin/api/books/{id}
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
async fn destroy(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<StatusCode> {
    CatalogService::new(state.pool(), state.notifier())
        .delete_book(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
