//! Quiet Core - window evaluation and notification triggering.
//!
//! This crate decides, for a set of recurring quiet hours windows and a
//! local instant, which windows are active and which notifications are due.
//! It performs no I/O of its own: windows come in, booleans and
//! notification intents go out, and delivery happens through the
//! [`delivery::Delivery`] trait.
//!
//! # Example
//!
//! ```
//! use quiet_core::{is_active, tick, EvaluationInstant, QuietWindow, TimeRange, Weekday};
//!
//! let window = QuietWindow::new("1", "Bedtime", vec![Weekday::Mon], TimeRange::from_hours(22, 6));
//!
//! let late = EvaluationInstant::parse("mon 23:30").unwrap();
//! assert!(is_active(&window, late));
//!
//! let intents = tick(&[window], EvaluationInstant::parse("mon 22:00").unwrap());
//! assert_eq!(intents.len(), 1);
//! ```

pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod evaluator;
pub mod trigger;
pub mod window;

pub use delivery::{
    Delivery, DeliveryOutcome, DeliveryRequest, DesktopDelivery, LogDelivery, NotificationMessage,
};
pub use dispatch::{is_duplicate, DeliveryResult, Dispatcher, TickReport};
pub use error::WindowError;
pub use evaluator::{
    active_windows, circular_distance, day_matches, is_active, phase, EvaluationInstant,
    WindowPhase,
};
pub use trigger::{
    tick, NotificationIntent, NotificationKind, NotificationTrigger, TriggerConfig,
    DEFAULT_REMINDER_LEAD_MINUTES, DEFAULT_TOLERANCE_MINUTES,
};
pub use window::{
    parse_days, QuietWindow, TimeOfDay, TimeRange, Weekday, WindowRecord, MINUTES_PER_DAY,
};
