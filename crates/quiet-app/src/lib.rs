//! Quiet Hours - recurring quiet windows with start, end and reminder
//! notifications.
//!
//! This crate provides the application layer behind the `quiet` binary:
//!
//! - Monitor configuration stored in the database ([`config`])
//! - The periodic notification monitor ([`monitor`])
//! - Window management and reporting commands ([`commands`])
//!
//! # Usage
//!
//! ```no_run
//! use quiet_app::config::MonitorConfig;
//! use quiet_app::monitor::Monitor;
//! use quiet_storage::Database;
//!
//! let db = Database::new().unwrap();
//! let config = MonitorConfig::load(&db).unwrap();
//!
//! let monitor = Monitor::new(db, config);
//! let report = monitor.run_tick().unwrap();
//! println!("{} notifications sent", report.notifications_sent);
//! ```

pub mod commands;
pub mod config;
pub mod monitor;

pub use config::{ConfigError, DeliveryKind, MonitorConfig};
pub use monitor::Monitor;
