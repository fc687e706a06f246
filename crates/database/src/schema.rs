//! Catalog schema fixture
//!
//! The real schema belongs to the device firmware and is never created by
//! kobosync. This installs the tables kobosync reads and writes so that a
//! plain SQLite file can stand in for a device in tests.

use kobosync_core::AppError;
use sqlx::SqliteConnection;

const CATALOG_SCHEMA: &str = include_str!("../fixtures/catalog_schema.sql");

/// Creates the `content`, `Shelf` and `ShelfContent` tables if missing
pub async fn create_catalog_schema(conn: &mut SqliteConnection) -> Result<(), AppError> {
    sqlx::raw_sql(CATALOG_SCHEMA)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database("Failed to create catalog schema", e))?;

    Ok(())
}

/// Inserts a bare content record, as the device does when it indexes a new file
///
/// `book_id` links chapter records to their book; root records pass `None`.
pub async fn register_content(
    conn: &mut SqliteConnection,
    content_id: &str,
    title: &str,
    book_id: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO content (ContentID, Title, BookID) VALUES (?, ?, ?)")
        .bind(content_id)
        .bind(title)
        .bind(book_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to register {}", content_id), e))?;

    Ok(())
}
