pub mod comments;
pub mod dashboard;
pub mod likes;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use vidtube_types::models::UserSummary;

/// Fixed-width RFC 3339 so that lexical order in SQL equals time order.
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads `id, username, full_name, avatar` starting at column `start`.
pub(crate) fn summary_at(row: &Row<'_>, start: usize) -> rusqlite::Result<UserSummary> {
    Ok(UserSummary {
        id: uuid_at(row, start)?,
        username: row.get(start + 1)?,
        full_name: row.get(start + 2)?,
        avatar: row.get(start + 3)?,
    })
}
