//! Window activation checks.
//!
//! Every function here is pure: the answer is recomputed from the window
//! definition and the supplied instant on each call, and no state is kept
//! between calls.
//!
//! ## Day matching
//!
//! A window only applies on the weekdays it lists, and only "today" is
//! consulted. An overnight window listed for Friday is therefore inactive in
//! the early hours of Saturday unless Saturday is listed as well.

use std::fmt;

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::WindowError;
use crate::window::{QuietWindow, TimeOfDay, Weekday, MINUTES_PER_DAY};

/// A local civil instant reduced to what evaluation needs.
///
/// Timezone resolution happens before this is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationInstant {
    pub weekday: Weekday,
    /// Minutes since local midnight, 0-1439.
    pub minute_of_day: u16,
}

impl EvaluationInstant {
    pub fn new(weekday: Weekday, minute_of_day: u16) -> Self {
        Self {
            weekday,
            minute_of_day,
        }
    }

    /// Creates an instant from a weekday and time of day.
    pub fn at(weekday: Weekday, time: TimeOfDay) -> Self {
        Self::new(weekday, time.to_minutes())
    }

    /// Creates an instant from any chrono date-time.
    pub fn from_datetime<T: Datelike + Timelike>(datetime: &T) -> Self {
        Self::new(
            Weekday::from_chrono(datetime.weekday()),
            (datetime.hour() * 60 + datetime.minute()) as u16,
        )
    }

    /// The current local instant.
    pub fn now() -> Self {
        Self::from_datetime(&chrono::Local::now())
    }

    /// Parses `"<day> HH:MM"`, e.g. `"mon 23:30"` or `"Friday 06:00"`.
    pub fn parse(s: &str) -> Result<Self, WindowError> {
        let invalid = || WindowError::InvalidInstant(s.to_string());

        let mut parts = s.split_whitespace();
        let (Some(day), Some(time), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };

        let weekday = Weekday::from_token(day).ok_or_else(invalid)?;
        let time = TimeOfDay::parse(time).map_err(|_| invalid())?;
        Ok(Self::at(weekday, time))
    }

    /// The time of day, or `None` if the minute is out of range.
    pub fn time(&self) -> Option<TimeOfDay> {
        TimeOfDay::from_minutes(self.minute_of_day)
    }

    fn is_valid(&self) -> bool {
        self.minute_of_day < MINUTES_PER_DAY
    }
}

impl fmt::Display for EvaluationInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time() {
            Some(time) => write!(f, "{} {}", self.weekday, time),
            None => write!(f, "{} +{}m", self.weekday, self.minute_of_day),
        }
    }
}

/// Distance between two minutes of the day, wrapping at midnight.
///
/// `circular_distance(0, 1439) == 1`.
pub fn circular_distance(a: u16, b: u16) -> u16 {
    let a = a % MINUTES_PER_DAY;
    let b = b % MINUTES_PER_DAY;
    let diff = a.abs_diff(b);
    diff.min(MINUTES_PER_DAY - diff)
}

/// Minutes to move forward from `from` to reach `to`, wrapping at midnight.
pub(crate) fn forward_distance(from: u16, to: u16) -> u16 {
    (to % MINUTES_PER_DAY + MINUTES_PER_DAY - from % MINUTES_PER_DAY) % MINUTES_PER_DAY
}

/// Returns true if the window lists the given weekday.
pub fn day_matches(window: &QuietWindow, weekday: Weekday) -> bool {
    window.days.contains(&weekday)
}

/// Returns true if the window is active at the given instant.
///
/// Disabled windows, unlisted weekdays and out-of-range minutes all yield
/// `false`. Both the start and end minute count as active.
pub fn is_active(window: &QuietWindow, instant: EvaluationInstant) -> bool {
    if !window.enabled || !instant.is_valid() {
        return false;
    }

    if !day_matches(window, instant.weekday) {
        return false;
    }

    window.time_range.contains_minute(instant.minute_of_day)
}

/// Returns the windows active at the given instant, in input order.
pub fn active_windows(windows: &[QuietWindow], instant: EvaluationInstant) -> Vec<&QuietWindow> {
    windows
        .iter()
        .filter(|window| is_active(window, instant))
        .collect()
}

/// Where a window stands relative to an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPhase {
    /// Nothing is happening for this window.
    Dormant,
    /// The window starts within the lead time.
    PreWindow,
    /// The window is active.
    Active,
    /// The window ended within the lead time.
    PostWindow,
}

impl WindowPhase {
    pub fn label(&self) -> &'static str {
        match self {
            WindowPhase::Dormant => "dormant",
            WindowPhase::PreWindow => "starting soon",
            WindowPhase::Active => "active",
            WindowPhase::PostWindow => "recently ended",
        }
    }
}

impl fmt::Display for WindowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies a window at an instant.
///
/// `lead_minutes` bounds how far ahead of the start a window counts as
/// [`WindowPhase::PreWindow`] and how long after the end it counts as
/// [`WindowPhase::PostWindow`]. Pre and post phases also require the weekday
/// to match.
pub fn phase(window: &QuietWindow, instant: EvaluationInstant, lead_minutes: u16) -> WindowPhase {
    if is_active(window, instant) {
        return WindowPhase::Active;
    }

    if !window.enabled || !instant.is_valid() || !day_matches(window, instant.weekday) {
        return WindowPhase::Dormant;
    }

    let t = instant.minute_of_day;
    let until_start = forward_distance(t, window.start().to_minutes());
    if (1..=lead_minutes).contains(&until_start) {
        return WindowPhase::PreWindow;
    }

    let since_end = forward_distance(window.end().to_minutes(), t);
    if (1..=lead_minutes).contains(&since_end) {
        return WindowPhase::PostWindow;
    }

    WindowPhase::Dormant
}
