//! Quiet window definitions.
//!
//! A quiet window is a recurring time-of-day interval tagged with the
//! weekdays it applies to (e.g., 22:00-06:00 on weeknights). Windows may
//! cross midnight, in which case the end time is earlier than the start.
//!
//! Windows arrive from storage as loosely typed [`WindowRecord`]s and are
//! converted once into a [`QuietWindow`], so evaluation only ever sees
//! well-formed minute and weekday values.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::WindowError;

/// Number of minutes in a civil day.
pub const MINUTES_PER_DAY: u16 = 1440;

/// Days of the week, serialized as three-letter lowercase tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    /// Returns all days of the week, Monday first.
    pub fn all() -> Vec<Weekday> {
        vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
    }

    /// Returns Monday through Friday.
    pub fn weekdays() -> Vec<Weekday> {
        vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ]
    }

    /// Returns Saturday and Sunday.
    pub fn weekends() -> Vec<Weekday> {
        vec![Weekday::Sat, Weekday::Sun]
    }

    /// Returns the canonical token for this day.
    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Mon => "mon",
            Weekday::Tue => "tue",
            Weekday::Wed => "wed",
            Weekday::Thu => "thu",
            Weekday::Fri => "fri",
            Weekday::Sat => "sat",
            Weekday::Sun => "sun",
        }
    }

    /// Canonicalizes a free-form day token.
    ///
    /// Matching is case-insensitive and only the first three characters are
    /// significant, so `"Monday"`, `"MON"` and `"mon"` all yield
    /// [`Weekday::Mon`]. Returns `None` for anything else.
    pub fn from_token(token: &str) -> Option<Weekday> {
        let prefix: String = token
            .chars()
            .take(3)
            .flat_map(char::to_lowercase)
            .collect();

        match prefix.as_str() {
            "mon" => Some(Weekday::Mon),
            "tue" => Some(Weekday::Tue),
            "wed" => Some(Weekday::Wed),
            "thu" => Some(Weekday::Thu),
            "fri" => Some(Weekday::Fri),
            "sat" => Some(Weekday::Sat),
            "sun" => Some(Weekday::Sun),
            _ => None,
        }
    }

    /// Converts from chrono's Weekday.
    pub fn from_chrono(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Weekday::Mon,
            chrono::Weekday::Tue => Weekday::Tue,
            chrono::Weekday::Wed => Weekday::Wed,
            chrono::Weekday::Thu => Weekday::Thu,
            chrono::Weekday::Fri => Weekday::Fri,
            chrono::Weekday::Sat => Weekday::Sat,
            chrono::Weekday::Sun => Weekday::Sun,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::from_token(s).ok_or_else(|| WindowError::UnknownDay(s.to_string()))
    }
}

/// Collects the recognizable weekdays from a list of tokens.
///
/// Unknown tokens are dropped and duplicates collapse.
pub fn parse_days<I, S>(tokens: I) -> BTreeSet<Weekday>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .filter_map(|token| Weekday::from_token(token.as_ref()))
        .collect()
}

/// Time of day with minute precision.
///
/// Serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Creates a new TimeOfDay.
    ///
    /// # Panics
    /// Panics if hour >= 24 or minute >= 60.
    pub fn new(hour: u8, minute: u8) -> Self {
        assert!(hour < 24, "hour must be 0-23");
        assert!(minute < 60, "minute must be 0-59");
        Self { hour, minute }
    }

    /// Creates a TimeOfDay from hour only (minute = 0).
    pub fn from_hour(hour: u8) -> Self {
        Self::new(hour, 0)
    }

    /// Creates a TimeOfDay from minutes since midnight.
    ///
    /// Returns `None` outside `[0, 1440)`.
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes >= MINUTES_PER_DAY {
            return None;
        }
        Some(Self {
            hour: (minutes / 60) as u8,
            minute: (minutes % 60) as u8,
        })
    }

    /// Parses `"HH:MM"` or `"HH:MM:SS"` (seconds are discarded).
    pub fn parse(s: &str) -> Result<Self, WindowError> {
        let trimmed = s.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map(Self::from_naive_time)
            .map_err(|_| WindowError::InvalidTime(s.to_string()))
    }

    /// Creates from a chrono NaiveTime.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Converts to minutes since midnight for comparison.
    pub fn to_minutes(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }
}

impl PartialOrd for TimeOfDay {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeOfDay {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_minutes().cmp(&other.to_minutes())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeOfDay::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = WindowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TimeOfDay::parse(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

/// A time range with inclusive start and end.
///
/// Supports overnight ranges where end < start (e.g., 22:00-06:00).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    /// Creates a new time range.
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Creates a time range from hour values.
    pub fn from_hours(start_hour: u8, end_hour: u8) -> Self {
        Self {
            start: TimeOfDay::from_hour(start_hour),
            end: TimeOfDay::from_hour(end_hour),
        }
    }

    /// Returns true if this range crosses midnight.
    pub fn is_overnight(&self) -> bool {
        self.end < self.start
    }

    /// Returns true if start and end are the same minute.
    pub fn is_zero_length(&self) -> bool {
        self.start == self.end
    }

    /// Checks whether a minute of the day falls within this range.
    ///
    /// Both ends are inclusive: 22:00-06:00 contains exactly 22:00 and
    /// exactly 06:00. A zero-length range contains only its single minute.
    pub fn contains_minute(&self, minute: u16) -> bool {
        let start = self.start.to_minutes();
        let end = self.end.to_minutes();

        if start > end {
            minute >= start || minute <= end
        } else {
            start <= minute && minute <= end
        }
    }

    /// Checks whether a time falls within this range.
    pub fn contains(&self, time: TimeOfDay) -> bool {
        self.contains_minute(time.to_minutes())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// A recurring quiet hours window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietWindow {
    /// Opaque identifier, unique per owner.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Days the window starts on.
    pub days: BTreeSet<Weekday>,
    /// Start and end time of day.
    pub time_range: TimeRange,
    /// Disabled windows never activate and never notify.
    pub enabled: bool,
    /// Gates notifications only, not activation.
    pub notifications_enabled: bool,
}

impl QuietWindow {
    /// Creates a new window, enabled and with notifications on.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        days: impl IntoIterator<Item = Weekday>,
        time_range: TimeRange,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            days: days.into_iter().collect(),
            time_range,
            enabled: true,
            notifications_enabled: true,
        }
    }

    /// The default overnight window offered to new users (22:00-08:00 daily).
    pub fn night(id: impl Into<String>) -> Self {
        Self::new(id, "Night", Weekday::all(), TimeRange::from_hours(22, 8))
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Disables this window.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Enables this window.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Turns notifications for this window on or off.
    pub fn set_notifications(&mut self, enabled: bool) {
        self.notifications_enabled = enabled;
    }

    pub fn start(&self) -> TimeOfDay {
        self.time_range.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.time_range.end
    }

    /// Comma-separated day tokens in week order, e.g. `"mon, wed"`.
    pub fn days_label(&self) -> String {
        self.days
            .iter()
            .map(Weekday::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Checks the rules an edit must satisfy before it is stored.
    ///
    /// Evaluation tolerates windows that fail these checks; this is for
    /// whoever creates or updates definitions.
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.name.trim().is_empty() {
            return Err(WindowError::EmptyName);
        }
        if self.days.is_empty() {
            return Err(WindowError::NoDays);
        }
        if self.time_range.is_zero_length() {
            return Err(WindowError::ZeroLength);
        }
        Ok(())
    }
}

/// A window definition as it is stored: times and days as plain strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub days_of_week: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub notifications_enabled: bool,
}

impl TryFrom<&WindowRecord> for QuietWindow {
    type Error = WindowError;

    /// Unknown day tokens are dropped; a record left with no days is
    /// rejected, as is an unparseable start or end time.
    fn try_from(record: &WindowRecord) -> Result<Self, Self::Error> {
        let start = TimeOfDay::parse(&record.start_time)?;
        let end = TimeOfDay::parse(&record.end_time)?;
        let days = parse_days(&record.days_of_week);
        if days.is_empty() {
            return Err(WindowError::NoDays);
        }

        Ok(Self {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            days,
            time_range: TimeRange::new(start, end),
            enabled: record.enabled,
            notifications_enabled: record.notifications_enabled,
        })
    }
}

impl From<&QuietWindow> for WindowRecord {
    fn from(window: &QuietWindow) -> Self {
        Self {
            id: window.id.clone(),
            name: window.name.clone(),
            description: window.description.clone(),
            start_time: window.start().to_string(),
            end_time: window.end().to_string(),
            days_of_week: window.days.iter().map(|d| d.as_str().to_string()).collect(),
            enabled: window.enabled,
            notifications_enabled: window.notifications_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Weekday Tests ====================

    #[test]
    fn weekday_groups() {
        assert_eq!(Weekday::weekdays().len(), 5);
        assert_eq!(Weekday::weekends().len(), 2);
        assert_eq!(Weekday::all().len(), 7);
    }

    #[test]
    fn weekday_token_canonicalization() {
        for token in ["Monday", "MON", "mon", "Mondayyy", "mOn"] {
            assert_eq!(Weekday::from_token(token), Some(Weekday::Mon), "{token}");
        }
        assert_eq!(Weekday::from_token("thursday"), Some(Weekday::Thu));
        assert_eq!(Weekday::from_token("SUN"), Some(Weekday::Sun));
    }

    #[test]
    fn weekday_unknown_tokens() {
        assert_eq!(Weekday::from_token(""), None);
        assert_eq!(Weekday::from_token("mo"), None);
        assert_eq!(Weekday::from_token("funday"), None);
        assert_eq!(Weekday::from_token(" mon"), None);
        assert!("noday".parse::<Weekday>().is_err());
    }

    #[test]
    fn parse_days_collapses_duplicates() {
        let days = parse_days(["monday", "MON", "Tue", "bogus"]);
        assert_eq!(days.len(), 2);
        assert!(days.contains(&Weekday::Mon));
        assert!(days.contains(&Weekday::Tue));
    }

    #[test]
    fn weekday_from_chrono() {
        assert_eq!(Weekday::from_chrono(chrono::Weekday::Sun), Weekday::Sun);
        assert_eq!(Weekday::from_chrono(chrono::Weekday::Wed), Weekday::Wed);
    }

    // ==================== TimeOfDay Tests ====================

    #[test]
    fn time_of_day_creation() {
        let time = TimeOfDay::new(14, 30);
        assert_eq!(time.hour(), 14);
        assert_eq!(time.minute(), 30);
    }

    #[test]
    #[should_panic(expected = "hour must be 0-23")]
    fn time_of_day_invalid_hour() {
        TimeOfDay::new(24, 0);
    }

    #[test]
    #[should_panic(expected = "minute must be 0-59")]
    fn time_of_day_invalid_minute() {
        TimeOfDay::new(12, 60);
    }

    #[test]
    fn time_of_day_to_minutes() {
        assert_eq!(TimeOfDay::new(0, 0).to_minutes(), 0);
        assert_eq!(TimeOfDay::new(12, 30).to_minutes(), 750);
        assert_eq!(TimeOfDay::new(23, 59).to_minutes(), 1439);
    }

    #[test]
    fn time_of_day_from_minutes() {
        assert_eq!(TimeOfDay::from_minutes(1320), Some(TimeOfDay::new(22, 0)));
        assert_eq!(TimeOfDay::from_minutes(1439), Some(TimeOfDay::new(23, 59)));
        assert_eq!(TimeOfDay::from_minutes(1440), None);
    }

    #[test]
    fn time_of_day_parse() {
        assert_eq!(TimeOfDay::parse("22:00").unwrap(), TimeOfDay::new(22, 0));
        assert_eq!(TimeOfDay::parse("06:05:00").unwrap(), TimeOfDay::new(6, 5));
        assert_eq!(TimeOfDay::parse(" 7:30 ").unwrap(), TimeOfDay::new(7, 30));
        assert!(matches!(
            TimeOfDay::parse("24:00"),
            Err(WindowError::InvalidTime(_))
        ));
        assert!(TimeOfDay::parse("noon").is_err());
        assert!(TimeOfDay::parse("").is_err());
    }

    #[test]
    fn time_of_day_display() {
        assert_eq!(TimeOfDay::new(6, 5).to_string(), "06:05");
    }

    // ==================== TimeRange Tests ====================

    #[test]
    fn time_range_same_day_is_inclusive() {
        let range = TimeRange::from_hours(8, 15);
        assert!(!range.is_overnight());

        assert!(!range.contains(TimeOfDay::new(7, 59)));
        assert!(range.contains(TimeOfDay::new(8, 0)));
        assert!(range.contains(TimeOfDay::new(12, 0)));
        assert!(range.contains(TimeOfDay::new(15, 0)));
        assert!(!range.contains(TimeOfDay::new(15, 1)));
    }

    #[test]
    fn time_range_overnight_is_inclusive() {
        let range = TimeRange::from_hours(22, 6);
        assert!(range.is_overnight());

        assert!(!range.contains(TimeOfDay::new(21, 59)));
        assert!(range.contains(TimeOfDay::new(22, 0)));
        assert!(range.contains(TimeOfDay::new(23, 59)));
        assert!(range.contains(TimeOfDay::new(0, 0)));
        assert!(range.contains(TimeOfDay::new(6, 0)));
        assert!(!range.contains(TimeOfDay::new(6, 1)));
        assert!(!range.contains(TimeOfDay::new(12, 0)));
    }

    #[test]
    fn time_range_zero_length_contains_single_minute() {
        let range = TimeRange::from_hours(9, 9);
        assert!(range.is_zero_length());
        assert!(range.contains(TimeOfDay::new(9, 0)));
        assert!(!range.contains(TimeOfDay::new(9, 1)));
        assert!(!range.contains(TimeOfDay::new(8, 59)));
    }

    // ==================== QuietWindow Tests ====================

    #[test]
    fn window_creation() {
        let window = QuietWindow::new(
            "1",
            "Focus",
            vec![Weekday::Mon, Weekday::Wed, Weekday::Mon],
            TimeRange::from_hours(9, 12),
        );

        assert_eq!(window.id, "1");
        assert!(window.enabled);
        assert!(window.notifications_enabled);
        assert_eq!(window.days.len(), 2);
        assert_eq!(window.days_label(), "mon, wed");
    }

    #[test]
    fn window_enable_disable() {
        let mut window = QuietWindow::night("n");
        window.disable();
        assert!(!window.enabled);
        window.enable();
        assert!(window.enabled);
        window.set_notifications(false);
        assert!(!window.notifications_enabled);
    }

    #[test]
    fn window_validation() {
        assert!(QuietWindow::night("n").validate().is_ok());

        let no_days = QuietWindow::new("a", "A", vec![], TimeRange::from_hours(1, 2));
        assert_eq!(no_days.validate(), Err(WindowError::NoDays));

        let zero = QuietWindow::new("b", "B", Weekday::all(), TimeRange::from_hours(3, 3));
        assert_eq!(zero.validate(), Err(WindowError::ZeroLength));

        let unnamed = QuietWindow::new("c", "  ", Weekday::all(), TimeRange::from_hours(1, 2));
        assert_eq!(unnamed.validate(), Err(WindowError::EmptyName));
    }

    #[test]
    fn night_preset_matches_form_defaults() {
        let window = QuietWindow::night("night");
        assert_eq!(window.start(), TimeOfDay::new(22, 0));
        assert_eq!(window.end(), TimeOfDay::new(8, 0));
        assert_eq!(window.days.len(), 7);
    }

    // ==================== WindowRecord Tests ====================

    #[test]
    fn record_converts_to_window() {
        let record = WindowRecord {
            id: "abc".into(),
            name: "Bedtime".into(),
            description: None,
            start_time: "22:00:00".into(),
            end_time: "06:00".into(),
            days_of_week: vec!["Monday".into(), "friday".into(), "xyz".into()],
            enabled: true,
            notifications_enabled: false,
        };

        let window = QuietWindow::try_from(&record).unwrap();
        assert_eq!(window.start(), TimeOfDay::new(22, 0));
        assert_eq!(window.end(), TimeOfDay::new(6, 0));
        assert_eq!(window.days_label(), "mon, fri");
        assert!(!window.notifications_enabled);
    }

    #[test]
    fn record_with_bad_fields_is_rejected() {
        let mut record = WindowRecord {
            id: "x".into(),
            name: "X".into(),
            start_time: "25:00".into(),
            end_time: "06:00".into(),
            days_of_week: vec!["mon".into()],
            ..Default::default()
        };
        assert!(matches!(
            QuietWindow::try_from(&record),
            Err(WindowError::InvalidTime(_))
        ));

        record.start_time = "22:00".into();
        record.days_of_week = vec!["nope".into()];
        assert_eq!(QuietWindow::try_from(&record), Err(WindowError::NoDays));
    }

    #[test]
    fn record_from_window_uses_canonical_tokens() {
        let window = QuietWindow::new(
            "7",
            "Lunch",
            vec![Weekday::Fri, Weekday::Mon],
            TimeRange::new(TimeOfDay::new(12, 0), TimeOfDay::new(12, 45)),
        );
        let record = WindowRecord::from(&window);
        assert_eq!(record.days_of_week, vec!["mon", "fri"]);
        assert_eq!(record.start_time, "12:00");
        assert_eq!(record.end_time, "12:45");
    }

    // ==================== Serialization Tests ====================

    #[test]
    fn weekday_serialization() {
        let json = serde_json::to_string(&Weekday::Mon).unwrap();
        assert_eq!(json, "\"mon\"");
    }

    #[test]
    fn window_serialization() {
        let window = QuietWindow::night("n").with_description("sleep");
        let json = serde_json::to_string(&window).unwrap();
        assert!(json.contains("\"22:00\""));

        let deserialized: QuietWindow = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, window);
    }

    #[test]
    fn time_of_day_rejects_bad_json() {
        let result: Result<TimeOfDay, _> = serde_json::from_str("\"99:99\"");
        assert!(result.is_err());
    }
}
