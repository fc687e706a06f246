//! Common types and utilities shared across domain models

use crate::error::AppError;
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder written for fields the user still has to fill in
pub const TODO_SENTINEL: &str = "TODO";

/// Timestamp layout used by the device catalog
pub const KOBO_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Returns true if the value is the unfilled placeholder
pub fn is_todo(value: &str) -> bool {
    value.trim() == TODO_SENTINEL
}

/// Wall-clock timestamp in the catalog's `YYYY-MM-DDThh:mm:ssZ` layout
///
/// The trailing `Z` is part of the layout only: values are local time,
/// no timezone conversion is ever applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KoboTimestamp(NaiveDateTime);

impl KoboTimestamp {
    /// Creates a timestamp for the current local wall-clock time
    pub fn now() -> Self {
        Self(Local::now().naive_local())
    }

    /// Creates a timestamp at midnight of the given day
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::MIN))
    }

    /// Parses a volume date (`DD-MM-YYYY` or `MM-YYYY`) into a day-granularity timestamp
    ///
    /// `field` names the document field in the returned schema error.
    pub fn from_volume_date(raw: &str, field: &str) -> Result<Self, AppError> {
        parse_volume_date(raw)
            .map(Self::from_date)
            .map_err(|reason| AppError::schema(field, reason))
    }

    /// Returns the underlying naive date-time
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for KoboTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(KOBO_TIME_FORMAT))
    }
}

fn parse_volume_date(raw: &str) -> Result<NaiveDate, String> {
    let tokens: Vec<&str> = raw.trim().split('-').map(str::trim).collect();
    let (day, month, year) = match tokens.as_slice() {
        [d, m, y] => (*d, *m, *y),
        [m, y] => ("1", *m, *y),
        _ => {
            return Err(format!(
                "expected DD-MM-YYYY or MM-YYYY, got '{}' ({} tokens)",
                raw,
                tokens.len()
            ))
        }
    };

    let day: u32 = day
        .parse()
        .map_err(|_| format!("invalid day '{}' in '{}'", day, raw))?;
    let month: u32 = month
        .parse()
        .map_err(|_| format!("invalid month '{}' in '{}'", month, raw))?;
    let year: i32 = year
        .parse()
        .map_err(|_| format!("invalid year '{}' in '{}'", year, raw))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("'{}' is not a calendar date", raw))
}

/// Trait for types that can validate themselves
pub trait Validator {
    /// Validates the instance and returns errors if invalid
    fn validate(&self) -> Result<(), Vec<String>>;

    /// Returns true if the instance is valid
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
