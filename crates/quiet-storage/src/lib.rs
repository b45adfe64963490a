//! Quiet Storage - SQLite persistence layer.
//!
//! This crate stores everything the quiet hours tools need between runs:
//!
//! - Window definitions, per owner
//! - The activity log (edits and sent notifications, newest first)
//! - Configuration key-value storage
//!
//! # Example
//!
//! ```no_run
//! use quiet_core::{TimeOfDay, Weekday};
//! use quiet_storage::{Database, NewWindow};
//!
//! let db = Database::in_memory().unwrap();
//!
//! let window = NewWindow::new("Night", TimeOfDay::new(22, 0), TimeOfDay::new(8, 0), Weekday::all());
//! let stored = db.create_window("local", &window).unwrap();
//!
//! let windows = db.quiet_windows("local").unwrap();
//! assert_eq!(windows[0].id, stored.id.to_string());
//! ```

mod database;
pub mod error;
pub mod models;
mod pool;
pub mod repository;
mod schema;

pub use database::{Database, RECENT_LOG_LIMIT};
pub use error::{Result, StorageError};
pub use models::{Config, LogAction, LogEntry, NewLogEntry, NewWindow, StoredWindow};
pub use pool::ConnectionPool;
pub use repository::{ConfigRepo, LogsRepo, WindowsRepo};
