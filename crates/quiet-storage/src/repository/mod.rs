//! Database repositories for each table.

use chrono::{DateTime, Utc};

pub mod config;
pub mod logs;
pub mod windows;

pub use config::ConfigRepo;
pub use logs::LogsRepo;
pub use windows::WindowsRepo;

/// Parse a datetime from SQLite format.
///
/// Accepts RFC 3339 and SQLite's `datetime('now')` output.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}
