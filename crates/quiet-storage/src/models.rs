//! Data models for storage.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use quiet_core::{NotificationKind, QuietWindow, TimeOfDay, TimeRange, Weekday, WindowError, WindowRecord};
use serde::{Deserialize, Serialize};

/// Kind of activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Created,
    Updated,
    Deleted,
    NotificationSent,
}

impl LogAction {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Created => "created",
            LogAction::Updated => "updated",
            LogAction::Deleted => "deleted",
            LogAction::NotificationSent => "notification_sent",
        }
    }

    /// Parse from database string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(LogAction::Created),
            "updated" => Some(LogAction::Updated),
            "deleted" => Some(LogAction::Deleted),
            "notification_sent" => Some(LogAction::NotificationSent),
            _ => None,
        }
    }
}

/// A stored window definition.
///
/// Times and days are kept as stored so that a malformed row can still be
/// listed; [`StoredWindow::to_quiet_window`] does the checked conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredWindow {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub days_of_week: Vec<String>,
    pub enabled: bool,
    pub notifications_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredWindow {
    /// The stored fields as a core record.
    pub fn to_record(&self) -> WindowRecord {
        WindowRecord {
            id: self.id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            days_of_week: self.days_of_week.clone(),
            enabled: self.enabled,
            notifications_enabled: self.notifications_enabled,
        }
    }

    /// Converts to an evaluable window.
    pub fn to_quiet_window(&self) -> Result<QuietWindow, WindowError> {
        QuietWindow::try_from(&self.to_record())
    }
}

/// Parameters for creating or replacing a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWindow {
    pub name: String,
    pub description: Option<String>,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub days: BTreeSet<Weekday>,
    pub enabled: bool,
    pub notifications_enabled: bool,
}

impl NewWindow {
    /// Creates an enabled window with notifications on.
    pub fn new(
        name: impl Into<String>,
        start_time: TimeOfDay,
        end_time: TimeOfDay,
        days: impl IntoIterator<Item = Weekday>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            start_time,
            end_time,
            days: days.into_iter().collect(),
            enabled: true,
            notifications_enabled: true,
        }
    }

    /// Rejects definitions the evaluator would never activate as intended.
    pub fn validate(&self) -> Result<(), WindowError> {
        self.as_quiet_window("").validate()
    }

    fn as_quiet_window(&self, id: &str) -> QuietWindow {
        QuietWindow {
            id: id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            days: self.days.clone(),
            time_range: TimeRange::new(self.start_time, self.end_time),
            enabled: self.enabled,
            notifications_enabled: self.notifications_enabled,
        }
    }

    /// Day tokens in the order they are stored.
    pub(crate) fn day_tokens(&self) -> Vec<String> {
        self.days.iter().map(|d| d.as_str().to_string()).collect()
    }
}

impl From<&QuietWindow> for NewWindow {
    fn from(window: &QuietWindow) -> Self {
        Self {
            name: window.name.clone(),
            description: window.description.clone(),
            start_time: window.start(),
            end_time: window.end(),
            days: window.days.clone(),
            enabled: window.enabled,
            notifications_enabled: window.notifications_enabled,
        }
    }
}

/// An activity log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub owner: String,
    pub window_id: String,
    pub action: LogAction,
    /// Set for `notification_sent` entries.
    pub kind: Option<NotificationKind>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for a new log entry.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub owner: String,
    pub window_id: String,
    pub action: LogAction,
    pub kind: Option<NotificationKind>,
    pub details: Option<String>,
}

/// A configuration key-value pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration key.
    pub key: String,
    /// Configuration value (JSON).
    pub value: serde_json::Value,
}
