//! Collection (shelf) records
//!
//! A collection is one `Shelf` row keyed by its name (used for `Id`,
//! `InternalName` and `Name` alike). Membership rows live in `ShelfContent`.

use super::rows::{list_rows, Filter, RowQuery};
use kobosync_core::{AppError, KoboTimestamp};
use log::debug;
use sqlx::SqliteConnection;

/// Creates an empty, visible collection
pub async fn create_collection(conn: &mut SqliteConnection, name: &str) -> Result<(), AppError> {
    let now = KoboTimestamp::now().to_string();

    sqlx::query(
        r#"
        INSERT INTO Shelf (CreationDate, Id, InternalName, LastModified, Name, Type,
                           _IsDeleted, _IsVisible, _IsSynced, _SyncTime, LastAccessed)
        VALUES (?, ?, ?, ?, ?, NULL, 'false', 'true', 'false', NULL, NULL)
        "#,
    )
    .bind(&now)
    .bind(name)
    .bind(name)
    .bind(&now)
    .bind(name)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to create collection '{}'", name), e))?;

    debug!("Created collection '{}'", name);
    Ok(())
}

/// Deletes a collection and all of its membership rows
///
/// Deleting a collection that does not exist is not an error. Returns the
/// number of membership rows removed.
pub async fn delete_collection(conn: &mut SqliteConnection, name: &str) -> Result<u64, AppError> {
    let members = sqlx::query("DELETE FROM ShelfContent WHERE ShelfName = ?")
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to empty collection '{}'", name), e))?;

    sqlx::query("DELETE FROM Shelf WHERE Id = ?")
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete collection '{}'", name), e))?;

    debug!(
        "Deleted collection '{}' ({} members)",
        name,
        members.rows_affected()
    );
    Ok(members.rows_affected())
}

/// Adds a record to a collection and bumps the collection's modification time
pub async fn add_membership(
    conn: &mut SqliteConnection,
    collection: &str,
    content_id: &str,
) -> Result<(), AppError> {
    let now = KoboTimestamp::now().to_string();

    sqlx::query(
        r#"
        INSERT INTO ShelfContent (ShelfName, ContentId, DateModified, _IsDeleted, _IsSynced)
        VALUES (?, ?, ?, 'false', 'false')
        "#,
    )
    .bind(collection)
    .bind(content_id)
    .bind(&now)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to add {} to '{}'", content_id, collection), e))?;

    sqlx::query("UPDATE Shelf SET LastModified = ? WHERE Id = ?")
        .bind(&now)
        .bind(collection)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to touch collection '{}'", collection), e))?;

    Ok(())
}

/// Lists collection identifiers
pub async fn list_collections(conn: &mut SqliteConnection) -> Result<Vec<String>, AppError> {
    let rows = list_rows(conn, &RowQuery::new("Shelf").fields(["Id"]).order_by("Id")).await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.text("Id").map(str::to_string))
        .collect())
}

/// Lists the content identifiers in a collection
pub async fn collection_members(conn: &mut SqliteConnection, name: &str) -> Result<Vec<String>, AppError> {
    let query = RowQuery::new("ShelfContent")
        .fields(["ContentId"])
        .filter(Filter::equals("ShelfName", name))
        .order_by("ContentId");

    let rows = list_rows(conn, &query).await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.text("ContentId").map(str::to_string))
        .collect())
}

/// Lists the titles of the records in a collection
pub async fn collection_contents(conn: &mut SqliteConnection, name: &str) -> Result<Vec<String>, AppError> {
    let members = collection_members(conn, name).await?;
    if members.is_empty() {
        return Ok(Vec::new());
    }

    let query = members.into_iter().fold(
        RowQuery::new("content").fields(["Title"]).order_by("Title"),
        |query, id| query.filter(Filter::equals("ContentID", id)),
    );

    let rows = list_rows(conn, &query).await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.text("Title").map(str::to_string))
        .collect())
}
