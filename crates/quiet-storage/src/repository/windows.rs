//! Quiet hours windows repository.

use rusqlite::{params, Connection, Row};

use super::parse_datetime;
use crate::error::{Result, StorageError};
use crate::models::{NewWindow, StoredWindow};

const WINDOW_COLUMNS: &str = "id, owner, name, description, start_time, end_time, days_of_week,
     enabled, notifications_enabled, created_at, updated_at";

/// Repository for window operations.
pub struct WindowsRepo;

impl WindowsRepo {
    /// Insert a new window for an owner.
    pub fn insert(conn: &Connection, owner: &str, window: &NewWindow) -> Result<i64> {
        let days_json = serde_json::to_string(&window.day_tokens())?;

        conn.execute(
            "INSERT INTO quiet_windows
             (owner, name, description, start_time, end_time, days_of_week, enabled, notifications_enabled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                owner,
                window.name,
                window.description,
                window.start_time.to_string(),
                window.end_time.to_string(),
                days_json,
                window.enabled as i32,
                window.notifications_enabled as i32,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a window by ID.
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<StoredWindow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {WINDOW_COLUMNS} FROM quiet_windows WHERE id = ?1"
        ))?;

        let window = stmt.query_row([id], row_to_window).ok();

        Ok(window)
    }

    /// Get all windows of an owner, earliest start first.
    pub fn get_by_owner(conn: &Connection, owner: &str) -> Result<Vec<StoredWindow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {WINDOW_COLUMNS} FROM quiet_windows WHERE owner = ?1
             ORDER BY start_time ASC, id ASC"
        ))?;

        let windows = stmt
            .query_map([owner], row_to_window)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(windows)
    }

    /// Replace every editable field of a window.
    pub fn update(conn: &Connection, id: i64, window: &NewWindow) -> Result<()> {
        let days_json = serde_json::to_string(&window.day_tokens())?;

        let updated = conn.execute(
            "UPDATE quiet_windows SET name = ?1, description = ?2, start_time = ?3, end_time = ?4,
             days_of_week = ?5, enabled = ?6, notifications_enabled = ?7,
             updated_at = datetime('now') WHERE id = ?8",
            params![
                window.name,
                window.description,
                window.start_time.to_string(),
                window.end_time.to_string(),
                days_json,
                window.enabled as i32,
                window.notifications_enabled as i32,
                id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::NotFound(format!("Window with id {}", id)));
        }

        Ok(())
    }

    /// Enable or disable a window.
    pub fn set_enabled(conn: &Connection, id: i64, enabled: bool) -> Result<()> {
        let updated = conn.execute(
            "UPDATE quiet_windows SET enabled = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![enabled as i32, id],
        )?;

        if updated == 0 {
            return Err(StorageError::NotFound(format!("Window with id {}", id)));
        }

        Ok(())
    }

    /// Delete a window.
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        let deleted = conn.execute("DELETE FROM quiet_windows WHERE id = ?1", [id])?;

        if deleted == 0 {
            return Err(StorageError::NotFound(format!("Window with id {}", id)));
        }

        Ok(())
    }

    /// Count windows of an owner.
    pub fn count(conn: &Connection, owner: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM quiet_windows WHERE owner = ?1",
            [owner],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_window(row: &Row<'_>) -> rusqlite::Result<StoredWindow> {
    let days_str: String = row.get(6)?;
    Ok(StoredWindow {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        days_of_week: serde_json::from_str(&days_str).unwrap_or_default(),
        enabled: row.get::<_, i32>(7)? != 0,
        notifications_enabled: row.get::<_, i32>(8)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}
