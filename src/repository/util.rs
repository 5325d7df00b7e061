//! Repository utilities.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind};

use super::pool::DbError;

/// Simple error info wrapper for database errors.
#[derive(Debug)]
pub struct DbErrorInfo(pub String);

impl DatabaseErrorInformation for DbErrorInfo {
    fn message(&self) -> &str {
        &self.0
    }
    fn details(&self) -> Option<&str> {
        None
    }
    fn hint(&self) -> Option<&str> {
        None
    }
    fn table_name(&self) -> Option<&str> {
        None
    }
    fn column_name(&self) -> Option<&str> {
        None
    }
    fn constraint_name(&self) -> Option<&str> {
        None
    }
    fn statement_position(&self) -> Option<i32> {
        None
    }
}

/// Convert any displayable error to a diesel error with proper message.
pub fn to_diesel_error(e: impl std::fmt::Display) -> DbError {
    DbError::DatabaseError(DatabaseErrorKind::Unknown, Box::new(DbErrorInfo(e.to_string())))
}

/// Whether the error is a UNIQUE constraint violation.
pub fn is_unique_violation(e: &DbError) -> bool {
    matches!(e, DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
}

/// Format a timestamp for storage.
///
/// Fixed microsecond precision with a `Z` suffix keeps stored strings
/// lexicographically ordered, so `ORDER BY created_at` is chronological.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Decode a JSON string list column.
pub fn parse_string_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

/// Encode a string list for a JSON column.
pub fn encode_string_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Escape `%`, `_` and `\` for use inside a LIKE pattern with `ESCAPE '\'`.
pub fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Clamp pagination parameters to sane bounds.
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>, max: i64) -> (i64, i64) {
    (
        limit.unwrap_or(20).clamp(1, max),
        offset.unwrap_or(0).max(0),
    )
}
