//! Window definition errors.

use thiserror::Error;

/// Errors raised when building or validating a quiet window.
///
/// Evaluation never produces these. They only surface where a loosely typed
/// record is turned into a [`QuietWindow`](crate::window::QuietWindow), or
/// when an edit is validated before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// A time-of-day value could not be parsed.
    #[error("invalid time of day: {0:?}")]
    InvalidTime(String),

    /// A weekday token was not recognized.
    #[error("unknown weekday: {0:?}")]
    UnknownDay(String),

    /// No recognizable weekday was given.
    #[error("at least one day of the week is required")]
    NoDays,

    /// Start and end are the same minute.
    #[error("start and end time cannot be the same")]
    ZeroLength,

    /// The window has no name.
    #[error("window name cannot be empty")]
    EmptyName,

    /// An evaluation instant could not be parsed.
    #[error("invalid instant {0:?}, expected \"<day> HH:MM\"")]
    InvalidInstant(String),
}
