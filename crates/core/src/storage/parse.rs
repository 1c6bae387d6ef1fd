//! Decoding of text columns

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Error as SqlError;

fn bad_text(e: impl std::error::Error + Send + Sync + 'static) -> SqlError {
    SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e))
}

/// RFC 3339 timestamp column
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(bad_text)
}

/// JSON body column
pub fn parse_body(s: &str) -> Result<serde_json::Value, SqlError> {
    serde_json::from_str(s).map_err(bad_text)
}
