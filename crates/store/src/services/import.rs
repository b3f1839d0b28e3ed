//! Bulk book import from CSV.
//!
//! Each data row is imported on its own: a bad row is recorded in the
//! report and the rest carry on. A row's category (created on demand) and
//! book commit together or not at all.

use std::collections::HashMap;
use std::io::Cursor;
use std::str::FromStr;

use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{info, instrument, warn};

use tram_sach_core::{BookId, Vnd};

use crate::db::books::insert_book;
use crate::db::categories::{find_by_name, insert_category, unique_slug};
use crate::db::{RepositoryError, now};
use crate::models::{Book, BookInput, Category, CategoryInput};
use crate::services::webhook::{CatalogNotifier, ProductAction};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Authors recorded when the column is missing or blank.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Errors that reject a whole upload.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file is not a `.csv`.
    #[error("only .csv files are accepted")]
    UnsupportedFormat,

    /// The file exceeds [`MAX_UPLOAD_BYTES`].
    #[error("file exceeds {MAX_UPLOAD_BYTES} bytes")]
    TooLarge,

    /// The header row is missing or has no recognised columns.
    #[error("invalid header row: {0}")]
    Header(String),

    /// A record could not be read.
    #[error("row {row}: {message}")]
    Malformed { row: usize, message: String },
}

/// Check an upload's name and size before reading it.
///
/// # Errors
///
/// Returns `ImportError::UnsupportedFormat` unless the name ends in `.csv`.
/// Returns `ImportError::TooLarge` if `len` exceeds [`MAX_UPLOAD_BYTES`].
pub fn validate_upload(filename: &str, len: usize) -> Result<(), ImportError> {
    let is_csv = std::path::Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(ImportError::UnsupportedFormat);
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(ImportError::TooLarge);
    }
    Ok(())
}

/// Book fields a sheet column can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Title,
    Authors,
    Category,
    Pages,
    PublishYear,
    Publisher,
    PriceVnd,
    Stock,
    RatingAvg,
    Description,
    ImageUrl,
}

impl Column {
    /// Map a header cell to a column. Matching ignores case and surrounding
    /// whitespace; unknown headers map to `None`.
    #[must_use]
    pub fn from_header(header: &str) -> Option<Self> {
        let column = match header.trim().to_lowercase().as_str() {
            "title" => Self::Title,
            "authors" => Self::Authors,
            "genres_primary" => Self::Category,
            "pages" => Self::Pages,
            "year" => Self::PublishYear,
            "publisher" => Self::Publisher,
            "price_vnd" => Self::PriceVnd,
            "stock" => Self::Stock,
            "rating_avg" => Self::RatingAvg,
            "short_summary" => Self::Description,
            "image_url" => Self::ImageUrl,
            _ => return None,
        };
        Some(column)
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Authors => "authors",
            Self::Category => "genres_primary",
            Self::Pages => "pages",
            Self::PublishYear => "year",
            Self::Publisher => "publisher",
            Self::PriceVnd => "price_vnd",
            Self::Stock => "stock",
            Self::RatingAvg => "rating_avg",
            Self::Description => "short_summary",
            Self::ImageUrl => "image_url",
        }
    }
}

/// One data row of a sheet, keyed by recognised column.
#[derive(Debug, Clone, Default)]
pub struct ImportRow {
    /// 1-based position in the sheet; the header is row 1.
    pub row: usize,
    cells: HashMap<Column, String>,
}

impl ImportRow {
    /// Build a row from `(header, value)` pairs, dropping unknown headers.
    pub fn new<'a>(row: usize, cells: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let cells = cells
            .into_iter()
            .filter_map(|(header, value)| {
                Column::from_header(header).map(|column| (column, value.trim().to_owned()))
            })
            .collect();
        Self { row, cells }
    }

    /// The trimmed value of a column, if present and non-blank.
    #[must_use]
    pub fn get(&self, column: Column) -> Option<&str> {
        self.cells
            .get(&column)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Parse CSV bytes into rows.
///
/// # Errors
///
/// Returns `ImportError::Header` if there is no header row or it has no
/// recognised column.
/// Returns `ImportError::Malformed` if a record cannot be decoded.
pub fn parse_csv(data: &[u8]) -> Result<Vec<ImportRow>, ImportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(Cursor::new(data));

    let headers = reader
        .headers()
        .map_err(|e| ImportError::Header(e.to_string()))?
        .clone();

    if !headers.iter().any(|h| Column::from_header(h).is_some()) {
        return Err(ImportError::Header("no recognised columns".to_owned()));
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 2;
        let record = record.map_err(|e| ImportError::Malformed {
            row,
            message: e.to_string(),
        })?;
        rows.push(ImportRow::new(row, headers.iter().zip(record.iter())));
    }

    Ok(rows)
}

/// A row that failed to import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub error: String,
}

/// A book created by the import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedBook {
    pub id: BookId,
    pub title: String,
    pub category: Option<String>,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub success: usize,
    pub errors: usize,
    pub skipped: usize,
    pub error_details: Vec<RowError>,
    pub imported_books: Vec<ImportedBook>,
}

impl ImportReport {
    /// One-line summary for the back office.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Import hoàn tất: {} thành công, {} lỗi",
            self.success, self.errors
        )
    }
}

/// A row turned into book fields, before touching the database.
#[derive(Debug)]
struct PreparedRow {
    book: BookInput,
    category: Option<String>,
}

#[derive(Debug, Error)]
enum RowFailure {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for RowFailure {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Bulk importer.
pub struct ImportService<'a> {
    pool: &'a SqlitePool,
    notifier: &'a CatalogNotifier,
}

impl<'a> ImportService<'a> {
    /// Create an import service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, notifier: &'a CatalogNotifier) -> Self {
        Self { pool, notifier }
    }

    /// Parse and import a CSV upload.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` if the file as a whole cannot be read. Row
    /// failures are reported, not returned.
    pub async fn import_csv(&self, data: &[u8]) -> Result<ImportReport, ImportError> {
        let rows = parse_csv(data)?;
        Ok(self.import_rows(rows).await)
    }

    /// Import rows one by one.
    ///
    /// Rows without a title are skipped. Every other row either creates a
    /// book (announced as `create`) or adds an entry to `error_details`.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn import_rows(&self, rows: Vec<ImportRow>) -> ImportReport {
        let mut report = ImportReport::default();

        for row in rows {
            if row.get(Column::Title).is_none() {
                report.skipped += 1;
                continue;
            }

            let outcome = match prepare_row(&row) {
                Ok(prepared) => self.store_row(&prepared).await,
                Err(message) => Err(RowFailure::Invalid(message)),
            };

            match outcome {
                Ok((book, category)) => {
                    report.success += 1;
                    report.imported_books.push(ImportedBook {
                        id: book.id,
                        title: book.title.clone(),
                        category: category.map(|c| c.name),
                    });
                    self.notifier.product_changed(ProductAction::Create, book);
                }
                Err(e) => {
                    warn!(row = row.row, error = %e, "Import row failed");
                    report.errors += 1;
                    report.error_details.push(RowError {
                        row: row.row,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            success = report.success,
            errors = report.errors,
            skipped = report.skipped,
            "Import finished"
        );
        report
    }

    async fn store_row(&self, row: &PreparedRow) -> Result<(Book, Option<Category>), RowFailure> {
        let mut tx = self.pool.begin().await?;

        let category = match row.category.as_deref() {
            Some(name) => Some(resolve_category(&mut tx, name).await?),
            None => None,
        };

        let mut input = row.book.clone();
        input.category_id = category.as_ref().map(|c| c.id);
        let book = insert_book(&mut tx, &input, now()).await?;

        tx.commit().await?;
        Ok((book, category))
    }
}

/// Find a category by exact name, creating it when missing.
async fn resolve_category(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Category, RepositoryError> {
    if let Some(category) = find_by_name(&mut *conn, name).await? {
        return Ok(category);
    }

    let slug = unique_slug(&mut *conn, name).await?;
    let input = CategoryInput {
        name: name.to_owned(),
        slug: None,
        description: Some(format!("Danh mục {name}")),
        image_url: None,
    };
    insert_category(conn, &input, &slug, now()).await
}

fn prepare_row(row: &ImportRow) -> Result<PreparedRow, String> {
    let text = |column| row.get(column).map(str::to_owned);

    let price = whole_number(row, Column::PriceVnd)?.unwrap_or(0);
    let stock = whole_number(row, Column::Stock)?.unwrap_or(0);
    if price < 0 {
        return Err("price_vnd must not be negative".to_owned());
    }
    if stock < 0 {
        return Err("stock must not be negative".to_owned());
    }

    let book = BookInput {
        title: text(Column::Title).unwrap_or_default(),
        authors: text(Column::Authors).unwrap_or_else(|| UNKNOWN_AUTHOR.to_owned()),
        description: text(Column::Description),
        price_vnd: Vnd::new(price),
        stock,
        image_url: text(Column::ImageUrl),
        rating_avg: decimal(row, Column::RatingAvg)?
            .and_then(|d| d.to_f64())
            .unwrap_or(0.0),
        pages: whole_number(row, Column::Pages)?.filter(|&p| p != 0),
        publisher: text(Column::Publisher),
        publish_year: whole_number(row, Column::PublishYear)?.filter(|&y| y != 0),
        is_active: true,
        category_id: None,
    };
    book.validate()?;

    Ok(PreparedRow {
        book,
        category: text(Column::Category),
    })
}

fn decimal(row: &ImportRow, column: Column) -> Result<Option<Decimal>, String> {
    row.get(column)
        .map(|raw| {
            Decimal::from_str(raw)
                .or_else(|_| Decimal::from_scientific(raw))
                .map_err(|_| format!("{} is not a number: {raw}", column.name()))
        })
        .transpose()
}

/// Parse an integer cell. Spreadsheet exports often write `39` as `39.0`,
/// so integral decimals are accepted.
fn whole_number(row: &ImportRow, column: Column) -> Result<Option<i64>, String> {
    let Some(value) = decimal(row, column)? else {
        return Ok(None);
    };
    if !value.fract().is_zero() {
        return Err(format!("{} must be a whole number: {value}", column.name()));
    }
    value
        .to_i64()
        .map(Some)
        .ok_or_else(|| format!("{} is out of range: {value}", column.name()))
}
