//! Content (book) records
//!
//! Root records (`BookID IS NULL`) are the books themselves; chapter and
//! page records point at their book through `BookID`.

use super::rows::{list_rows, Filter, RowQuery};
use kobosync_core::{AppError, KoboTimestamp};
use log::debug;
use sqlx::SqliteConnection;

const CONTENT_TABLE: &str = "content";

/// Series grouping written onto a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSlot {
    pub name: String,
    pub number: u32,
}

impl SeriesSlot {
    pub fn new(name: impl Into<String>, number: u32) -> Self {
        Self {
            name: name.into(),
            number,
        }
    }
}

/// Partial update of a content record; only present fields are written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentEdit {
    pub attribution: Option<String>,
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub date_created: Option<KoboTimestamp>,
    /// Sets `Series`, `SeriesID`, `SeriesNumber` and `SeriesNumberFloat`
    pub series: Option<SeriesSlot>,
}

impl ContentEdit {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Returns the identifier of the first record with this exact title
pub async fn find_by_title(conn: &mut SqliteConnection, title: &str) -> Result<Option<String>, AppError> {
    sqlx::query_scalar("SELECT ContentID FROM content WHERE Title = ? LIMIT 1")
        .bind(title)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::database("Failed to find content by title", e))
}

/// Returns the identifier of the first root record whose identifier ends with `filename`
pub async fn find_by_filename_suffix(
    conn: &mut SqliteConnection,
    filename: &str,
) -> Result<Option<String>, AppError> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT ContentID FROM content WHERE BookID IS NULL")
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::database("Failed to list root content", e))?;

    Ok(ids.into_iter().find(|id| id.ends_with(filename)))
}

/// Checks whether a record with this identifier exists
pub async fn content_exists(conn: &mut SqliteConnection, content_id: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content WHERE ContentID = ?")
        .bind(content_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::database("Failed to look up content", e))?;

    Ok(count > 0)
}

/// Lists the titles of every root record
pub async fn list_books(conn: &mut SqliteConnection) -> Result<Vec<String>, AppError> {
    let query = RowQuery::new(CONTENT_TABLE)
        .fields(["Title"])
        .filter(Filter::is_null("BookID"))
        .order_by("Title");

    let rows = list_rows(conn, &query).await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.text("Title").map(str::to_string))
        .collect())
}

/// Value written by [`edit`]
enum ColumnValue {
    Text(String),
    Real(f64),
}

/// Applies a partial update, one statement per present field
///
/// Returns the number of columns written.
pub async fn edit(conn: &mut SqliteConnection, content_id: &str, changes: &ContentEdit) -> Result<usize, AppError> {
    let mut columns: Vec<(&'static str, ColumnValue)> = [
        ("Attribution", changes.attribution.clone()),
        ("Title", changes.title.clone()),
        ("Publisher", changes.publisher.clone()),
        ("Language", changes.language.clone()),
        ("Description", changes.description.clone()),
        ("DateCreated", changes.date_created.map(|t| t.to_string())),
    ]
    .into_iter()
    .filter_map(|(column, value)| value.map(|v| (column, ColumnValue::Text(v))))
    .collect();

    if let Some(series) = &changes.series {
        columns.push(("Series", ColumnValue::Text(series.name.clone())));
        columns.push(("SeriesID", ColumnValue::Text(series.name.clone())));
        columns.push(("SeriesNumber", ColumnValue::Text(series.number.to_string())));
        columns.push(("SeriesNumberFloat", ColumnValue::Real(f64::from(series.number))));
    }

    for (column, value) in &columns {
        update_column(conn, content_id, column, value).await?;
    }

    debug!("Updated {} columns of {}", columns.len(), content_id);
    Ok(columns.len())
}

async fn update_column(
    conn: &mut SqliteConnection,
    content_id: &str,
    column: &str,
    value: &ColumnValue,
) -> Result<(), AppError> {
    // Column names come from the fixed list in `edit`, never from input
    let sql = format!("UPDATE content SET {} = ? WHERE ContentID = ?", column);
    let statement = sqlx::query(&sql);
    let statement = match value {
        ColumnValue::Text(text) => statement.bind(text.as_str()),
        ColumnValue::Real(number) => statement.bind(*number),
    };

    statement
        .bind(content_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to update {}", column), e))?;

    Ok(())
}

/// Deletes a record and every record whose `BookID` points at it
///
/// Returns the number of rows deleted.
pub async fn remove(conn: &mut SqliteConnection, content_id: &str) -> Result<u64, AppError> {
    let book = sqlx::query("DELETE FROM content WHERE ContentID = ?")
        .bind(content_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database("Failed to delete content", e))?;

    let children = sqlx::query("DELETE FROM content WHERE BookID = ?")
        .bind(content_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database("Failed to delete child content", e))?;

    Ok(book.rows_affected() + children.rows_affected())
}
