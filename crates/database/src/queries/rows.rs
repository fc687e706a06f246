//! Generic row listing
//!
//! Table and column names cannot be bound as parameters, so they are checked
//! against a strict identifier pattern and quoted. Values always go through
//! bound parameters.

use kobosync_core::AppError;
use log::debug;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqliteConnection, TypeInfo, ValueRef};
use std::fmt;

/// A single SQLite value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl CatalogValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for CatalogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Real(value) => write!(f, "{}", value),
            Self::Text(value) => write!(f, "{}", value),
            Self::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// One result row, columns in query order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRow {
    columns: Vec<String>,
    values: Vec<CatalogValue>,
}

impl CatalogRow {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[CatalogValue] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&CatalogValue> {
        self.columns
            .iter()
            .position(|name| name.eq_ignore_ascii_case(column))
            .map(|index| &self.values[index])
    }

    /// Returns the text value of a column, `None` if absent, NULL or not text
    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(CatalogValue::as_text)
    }

    fn from_sqlite(row: &SqliteRow) -> Result<Self, AppError> {
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());

        for column in row.columns() {
            let index = column.ordinal();
            let raw = row
                .try_get_raw(index)
                .map_err(|e| AppError::database("Failed to read column", e))?;

            let value = if raw.is_null() {
                CatalogValue::Null
            } else {
                let type_name = raw.type_info().name().to_string();
                match type_name.as_str() {
                    "INTEGER" => CatalogValue::Integer(decode(row, index)?),
                    "REAL" => CatalogValue::Real(decode(row, index)?),
                    "BLOB" => CatalogValue::Blob(decode(row, index)?),
                    _ => CatalogValue::Text(decode(row, index)?),
                }
            };

            columns.push(column.name().to_string());
            values.push(value);
        }

        Ok(Self { columns, values })
    }
}

fn decode<'r, T>(row: &'r SqliteRow, index: usize) -> Result<T, AppError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite>,
{
    row.try_get_unchecked(index)
        .map_err(|e| AppError::database("Failed to decode column", e))
}

/// A condition on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Equals(String, String),
    IsNull(String),
    IsNotNull(String),
}

impl Filter {
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals(column.into(), value.into())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::IsNotNull(column.into())
    }

    fn column(&self) -> &str {
        match self {
            Self::Equals(column, _) | Self::IsNull(column) | Self::IsNotNull(column) => column,
        }
    }
}

/// How several filters combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// A row matches if any filter matches
    #[default]
    Any,
    /// A row matches only if every filter matches
    All,
}

impl FilterMode {
    fn joiner(&self) -> &'static str {
        match self {
            Self::Any => " OR ",
            Self::All => " AND ",
        }
    }
}

/// `SELECT` description for [`list_rows`]
#[derive(Debug, Clone, Default)]
pub struct RowQuery {
    pub table: String,
    /// Columns to return; empty returns every column
    pub fields: Vec<String>,
    pub filters: Vec<Filter>,
    pub mode: FilterMode,
    pub order: Option<String>,
}

impl RowQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn mode(mut self, mode: FilterMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order = Some(column.into());
        self
    }

    /// Builds the SQL text and the values to bind, in order
    fn to_sql(&self) -> Result<(String, Vec<String>), AppError> {
        let columns = if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields
                .iter()
                .map(|field| quote_identifier(field))
                .collect::<Result<Vec<_>, _>>()?
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", columns, quote_identifier(&self.table)?);
        let mut binds = Vec::new();

        if !self.filters.is_empty() {
            let mut clauses = Vec::with_capacity(self.filters.len());
            for filter in &self.filters {
                let column = quote_identifier(filter.column())?;
                let clause = match filter {
                    Filter::Equals(_, value) => {
                        binds.push(value.clone());
                        format!("{} = ?", column)
                    }
                    Filter::IsNull(_) => format!("{} IS NULL", column),
                    Filter::IsNotNull(_) => format!("{} IS NOT NULL", column),
                };
                clauses.push(clause);
            }
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(self.mode.joiner()));
        }

        if let Some(order) = &self.order {
            sql.push_str(" ORDER BY ");
            sql.push_str(&quote_identifier(order)?);
        }

        Ok((sql, binds))
    }
}

/// Checks that a name is a plain SQL identifier and double-quotes it
fn quote_identifier(name: &str) -> Result<String, AppError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(format!("\"{}\"", name))
    } else {
        Err(AppError::InvalidArgument {
            argument: name.to_string(),
            reason: "not a valid table or column name".to_string(),
        })
    }
}

/// Returns the column names of a table, in declaration order
pub async fn table_fields(conn: &mut SqliteConnection, table: &str) -> Result<Vec<String>, AppError> {
    quote_identifier(table)?;

    let fields: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?) ORDER BY cid")
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::database("Failed to read table columns", e))?;

    if fields.is_empty() {
        return Err(AppError::RecordNotFound {
            entity: "table".to_string(),
            identifier: table.to_string(),
        });
    }

    Ok(fields)
}

/// Lists rows matching a query
pub async fn list_rows(conn: &mut SqliteConnection, query: &RowQuery) -> Result<Vec<CatalogRow>, AppError> {
    let (sql, binds) = query.to_sql()?;
    debug!("{} {:?}", sql, binds);

    let mut statement = sqlx::query(&sql);
    for value in binds {
        statement = statement.bind(value);
    }

    let rows = statement
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to list rows of {}", query.table), e))?;

    rows.iter().map(CatalogRow::from_sqlite).collect()
}
