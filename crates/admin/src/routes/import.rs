//! Bulk book import from an uploaded CSV file.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
};
use tracing::instrument;

use tram_sach_store::services::import::{MAX_UPLOAD_BYTES, validate_upload};
use tram_sach_store::services::{ImportReport, ImportService};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the import router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/api/import-products", post(import_products))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD))
}

/// POST /admin/api/import-products
///
/// Rows are committed one at a time; the report lists what was imported
/// and which rows failed.
#[instrument(skip(admin, state, multipart), fields(admin_id = %admin.id))]
async fn import_products(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportReport>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        validate_upload(&filename, 0)?;

        let data = field.bytes().await?;
        validate_upload(&filename, data.len())?;

        let report = ImportService::new(state.pool(), state.notifier())
            .import_csv(&data)
            .await?;

        tracing::info!(
            filename = %filename,
            success = report.success,
            errors = report.errors,
            skipped = report.skipped,
            "Import finished"
        );
        return Ok(Json(report));
    }

    Err(AppError::BadRequest(format!(
        "missing multipart field \"{FILE_FIELD}\""
    )))
}
