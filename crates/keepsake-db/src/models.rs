//! Database row types and column codecs.
//! Distinct from keepsake-types API models to keep the DB layer independent.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use keepsake_types::models::RecordMeta;

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub created_at: String,
}

/// Record timestamps are stored with fixed microsecond precision so that text
/// order equals time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Columns 0..=3 of every record table.
pub const META_COLUMNS: usize = 4;

pub fn meta_from_row(row: &Row<'_>) -> rusqlite::Result<RecordMeta> {
    let created_at: String = row.get(3)?;
    Ok(RecordMeta {
        id: uuid_column(row, 0)?,
        author_id: uuid_column(row, 1)?,
        author_name: row.get(2)?,
        created_at: parse_timestamp(&created_at).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("bad timestamp '{}'", created_at).into(),
            )
        })?,
    })
}

pub fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
