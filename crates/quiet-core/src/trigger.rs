//! Per-tick notification triggering.
//!
//! A driver calls [`NotificationTrigger::tick`] roughly once a minute with
//! the full window list. Each window can emit three kinds of intent:
//!
//! - `reminder` when the start is [`TriggerConfig::reminder_lead_minutes`] away
//! - `start` at the start minute
//! - `end` at the end minute
//!
//! Matching uses a symmetric tolerance under circular (midnight-wrapping)
//! distance, since the driver's cadence is not aligned to minute boundaries.
//! Nothing is remembered between ticks, so two consecutive ticks inside the
//! tolerance band will both emit; see [`crate::dispatch::is_duplicate`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::evaluator::{circular_distance, day_matches, EvaluationInstant};
use crate::window::{QuietWindow, MINUTES_PER_DAY};

/// Default minutes between the reminder and the window start.
pub const DEFAULT_REMINDER_LEAD_MINUTES: u16 = 15;

/// Default matching tolerance in minutes, either side.
pub const DEFAULT_TOLERANCE_MINUTES: u16 = 1;

/// The event a notification announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reminder,
    Start,
    End,
}

impl NotificationKind {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Reminder => "reminder",
            NotificationKind::Start => "start",
            NotificationKind::End => "end",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reminder" => Some(NotificationKind::Reminder),
            "start" => Some(NotificationKind::Start),
            "end" => Some(NotificationKind::End),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification that should be delivered for this tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub window_id: String,
    pub kind: NotificationKind,
    /// Minute of day of the tick that produced the intent.
    pub fired_at_minute: u16,
}

/// Trigger thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub reminder_lead_minutes: u16,
    pub tolerance_minutes: u16,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            reminder_lead_minutes: DEFAULT_REMINDER_LEAD_MINUTES,
            tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
        }
    }
}

impl TriggerConfig {
    /// Minute of day the reminder targets for a given start minute.
    pub fn reminder_target(&self, start_minute: u16) -> u16 {
        let lead = self.reminder_lead_minutes % MINUTES_PER_DAY;
        (start_minute + MINUTES_PER_DAY - lead) % MINUTES_PER_DAY
    }

    fn within_tolerance(&self, t: u16, target: u16) -> bool {
        circular_distance(t, target) <= self.tolerance_minutes
    }
}

/// Computes notification intents. Holds configuration only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationTrigger {
    config: TriggerConfig,
}

impl NotificationTrigger {
    pub fn new(config: TriggerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Intents a single window emits at `now`, ordered start, end, reminder.
    pub fn intents_for(
        &self,
        window: &QuietWindow,
        now: EvaluationInstant,
    ) -> Vec<NotificationIntent> {
        if !window.enabled || !window.notifications_enabled {
            return Vec::new();
        }

        let t = now.minute_of_day;
        if t >= MINUTES_PER_DAY || !day_matches(window, now.weekday) {
            return Vec::new();
        }

        let start = window.start().to_minutes();
        let end = window.end().to_minutes();
        let reminder = self.config.reminder_target(start);

        [
            (NotificationKind::Start, start),
            (NotificationKind::End, end),
            (NotificationKind::Reminder, reminder),
        ]
        .into_iter()
        .filter(|(_, target)| self.config.within_tolerance(t, *target))
        .map(|(kind, _)| {
            debug!(window_id = %window.id, %kind, minute = t, "Notification due");
            NotificationIntent {
                window_id: window.id.clone(),
                kind,
                fired_at_minute: t,
            }
        })
        .collect()
    }

    /// Intents for every window at `now`, in window order.
    pub fn tick(&self, windows: &[QuietWindow], now: EvaluationInstant) -> Vec<NotificationIntent> {
        windows
            .iter()
            .flat_map(|window| self.intents_for(window, now))
            .collect()
    }
}

/// Runs one tick with the default thresholds.
pub fn tick(windows: &[QuietWindow], now: EvaluationInstant) -> Vec<NotificationIntent> {
    NotificationTrigger::default().tick(windows, now)
}
