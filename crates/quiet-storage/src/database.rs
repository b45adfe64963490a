//! High-level database interface.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use quiet_core::{NotificationKind, QuietWindow};
use tracing::{info, warn};

use crate::error::{Result, StorageError};
use crate::models::{Config, LogAction, LogEntry, NewLogEntry, NewWindow, StoredWindow};
use crate::pool::ConnectionPool;
use crate::repository::{ConfigRepo, LogsRepo, WindowsRepo};

/// Entries shown by the activity log.
pub const RECENT_LOG_LIMIT: i64 = 50;

/// High-level database interface for quiet hours.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "quiet-hours", "quiet-hours")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("quiet-hours.db"))
    }

    // === Windows ===

    /// Create a window and record it in the activity log.
    pub fn create_window(&self, owner: &str, window: &NewWindow) -> Result<StoredWindow> {
        window.validate()?;

        let conn = self.pool.get()?;
        let id = WindowsRepo::insert(&conn, owner, window)?;
        append_audit(&conn, owner, id, &window.name, LogAction::Created, "created")?;

        info!(id, name = %window.name, "Window created");
        WindowsRepo::get_by_id(&conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("Window with id {}", id)))
    }

    /// Replace a window's definition.
    pub fn update_window(&self, id: i64, window: &NewWindow) -> Result<StoredWindow> {
        window.validate()?;

        let conn = self.pool.get()?;
        let existing = WindowsRepo::get_by_id(&conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("Window with id {}", id)))?;

        WindowsRepo::update(&conn, id, window)?;
        append_audit(&conn, &existing.owner, id, &window.name, LogAction::Updated, "updated")?;

        WindowsRepo::get_by_id(&conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("Window with id {}", id)))
    }

    /// Enable or disable a window.
    pub fn set_window_enabled(&self, id: i64, enabled: bool) -> Result<StoredWindow> {
        let conn = self.pool.get()?;
        let existing = WindowsRepo::get_by_id(&conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("Window with id {}", id)))?;

        WindowsRepo::set_enabled(&conn, id, enabled)?;
        let verb = if enabled { "enabled" } else { "disabled" };
        append_audit(&conn, &existing.owner, id, &existing.name, LogAction::Updated, verb)?;

        Ok(StoredWindow {
            enabled,
            ..existing
        })
    }

    /// Delete a window. Its log entries are kept.
    pub fn delete_window(&self, id: i64) -> Result<StoredWindow> {
        let conn = self.pool.get()?;
        let existing = WindowsRepo::get_by_id(&conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("Window with id {}", id)))?;

        WindowsRepo::delete(&conn, id)?;
        append_audit(&conn, &existing.owner, id, &existing.name, LogAction::Deleted, "deleted")?;

        info!(id, name = %existing.name, "Window deleted");
        Ok(existing)
    }

    /// Get a window by ID.
    pub fn get_window(&self, id: i64) -> Result<Option<StoredWindow>> {
        let conn = self.pool.get()?;
        WindowsRepo::get_by_id(&conn, id)
    }

    /// All stored windows of an owner.
    pub fn windows_for_owner(&self, owner: &str) -> Result<Vec<StoredWindow>> {
        let conn = self.pool.get()?;
        WindowsRepo::get_by_owner(&conn, owner)
    }

    /// The owner's windows in evaluable form. Rows that fail conversion are
    /// skipped with a warning.
    pub fn quiet_windows(&self, owner: &str) -> Result<Vec<QuietWindow>> {
        let windows = self
            .windows_for_owner(owner)?
            .iter()
            .filter_map(|stored| match stored.to_quiet_window() {
                Ok(window) => Some(window),
                Err(e) => {
                    warn!(id = stored.id, name = %stored.name, "Skipping malformed window: {}", e);
                    None
                }
            })
            .collect();

        Ok(windows)
    }

    // === Activity log ===

    /// Record a delivered notification.
    pub fn log_notification(
        &self,
        owner: &str,
        window_id: &str,
        kind: NotificationKind,
        recipient: &str,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.pool.get()?;
        let entry = NewLogEntry {
            owner: owner.to_string(),
            window_id: window_id.to_string(),
            action: LogAction::NotificationSent,
            kind: Some(kind),
            details: Some(format!("{} notification sent to {}", kind, recipient)),
        };
        LogsRepo::insert(&conn, &entry, at)
    }

    /// When a notification of `kind` was last sent for a window.
    pub fn last_notification(
        &self,
        window_id: &str,
        kind: NotificationKind,
    ) -> Result<Option<DateTime<Utc>>> {
        let conn = self.pool.get()?;
        LogsRepo::last_notification(&conn, window_id, kind)
    }

    /// Most recent activity of an owner, newest first.
    pub fn recent_logs(&self, owner: &str) -> Result<Vec<LogEntry>> {
        let conn = self.pool.get()?;
        LogsRepo::recent(&conn, owner, RECENT_LOG_LIMIT)
    }

    /// Delete log entries older than `before`.
    pub fn prune_logs(&self, before: DateTime<Utc>) -> Result<usize> {
        let conn = self.pool.get()?;
        let removed = LogsRepo::prune(&conn, before)?;
        if removed > 0 {
            info!(removed, "Pruned activity log");
        }
        Ok(removed)
    }

    // === Config ===

    /// Get a config value.
    pub fn get_config(&self, key: &str) -> Result<Option<Config>> {
        let conn = self.pool.get()?;
        ConfigRepo::get(&conn, key)
    }

    /// Set a config value.
    pub fn set_config(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.pool.get()?;
        ConfigRepo::set(&conn, key, value)
    }

    /// Store a serializable config value.
    pub fn set_config_typed<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let conn = self.pool.get()?;
        ConfigRepo::set_typed(&conn, key, value)
    }

    /// Delete a config value.
    pub fn delete_config(&self, key: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        ConfigRepo::delete(&conn, key)
    }

    /// Get a typed config value with default.
    pub fn get_config_or_default<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
        default: T,
    ) -> Result<T> {
        let conn = self.pool.get()?;
        ConfigRepo::get_or_default(&conn, key, default)
    }
}

fn append_audit(
    conn: &rusqlite::Connection,
    owner: &str,
    window_id: i64,
    name: &str,
    action: LogAction,
    verb: &str,
) -> Result<()> {
    let entry = NewLogEntry {
        owner: owner.to_string(),
        window_id: window_id.to_string(),
        action,
        kind: None,
        details: Some(format!("Schedule \"{}\" {}", name, verb)),
    };
    LogsRepo::insert(conn, &entry, Utc::now())?;
    Ok(())
}
