//! Tick dispatch: trigger, deduplicate, deliver, report.
//!
//! [`Dispatcher::run_tick`] is what a periodic driver calls. It evaluates the
//! trigger for `now`, drops intents the caller reports as already fired,
//! hands the rest to a [`Delivery`] one by one and aggregates the outcomes
//! into a [`TickReport`]. A failed delivery does not stop the tick.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::delivery::{Delivery, DeliveryOutcome, DeliveryRequest};
use crate::evaluator::EvaluationInstant;
use crate::trigger::{NotificationIntent, NotificationKind, NotificationTrigger};
use crate::window::QuietWindow;

/// Returns true if an intent fired `since_last_fired` ago is the same
/// occurrence as one firing now.
///
/// One occurrence can match on every tick within `tolerance` minutes either
/// side of its target, so anything fired within `2 * tolerance + 1` minutes
/// counts. A last-fired time slightly in the future (clock stepped back) is
/// treated the same way.
pub fn is_duplicate(since_last_fired: Option<Duration>, tolerance_minutes: u16) -> bool {
    let Some(elapsed) = since_last_fired else {
        return false;
    };
    let span = Duration::minutes(2 * i64::from(tolerance_minutes) + 1);
    elapsed > -span && elapsed <= span
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub window_id: String,
    pub kind: NotificationKind,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub timestamp: NaiveDateTime,
    pub windows_checked: usize,
    /// Delivery attempts made this tick.
    pub notifications_sent: usize,
    /// Intents dropped as duplicates of an earlier tick.
    pub suppressed: usize,
    pub results: Vec<DeliveryResult>,
}

impl TickReport {
    pub fn new(timestamp: NaiveDateTime, windows_checked: usize) -> Self {
        Self {
            timestamp,
            windows_checked,
            notifications_sent: 0,
            suppressed: 0,
            results: Vec::new(),
        }
    }

    /// Records a delivery attempt.
    pub fn record(&mut self, intent: &NotificationIntent, outcome: &DeliveryOutcome) {
        self.notifications_sent += 1;
        self.results.push(DeliveryResult {
            window_id: intent.window_id.clone(),
            kind: intent.kind,
            success: outcome.was_delivered(),
            error: outcome.error().map(str::to_string),
        });
    }

    /// Records an intent dropped as a duplicate.
    pub fn record_suppressed(&mut self) {
        self.suppressed += 1;
    }

    /// Number of successful deliveries.
    pub fn delivered(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Number of failed deliveries.
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    /// Successful results, for the caller to record in its log.
    pub fn successes(&self) -> impl Iterator<Item = &DeliveryResult> {
        self.results.iter().filter(|r| r.success)
    }
}

/// Runs ticks against a delivery collaborator.
pub struct Dispatcher<'a> {
    trigger: NotificationTrigger,
    delivery: &'a dyn Delivery,
    recipient: String,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        trigger: NotificationTrigger,
        delivery: &'a dyn Delivery,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            trigger,
            delivery,
            recipient: recipient.into(),
        }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Runs one tick at local civil time `now`.
    ///
    /// `already_fired` is asked about each intent before delivery; returning
    /// true suppresses it.
    pub fn run_tick<F>(&self, windows: &[QuietWindow], now: NaiveDateTime, mut already_fired: F) -> TickReport
    where
        F: FnMut(&NotificationIntent) -> bool,
    {
        let instant = EvaluationInstant::from_datetime(&now);
        let mut report = TickReport::new(now, windows.len());

        let intents = self.trigger.tick(windows, instant);
        if intents.is_empty() {
            return report;
        }

        let by_id: HashMap<&str, &QuietWindow> =
            windows.iter().map(|w| (w.id.as_str(), w)).collect();

        for intent in intents {
            let Some(window) = by_id.get(intent.window_id.as_str()) else {
                continue;
            };

            if already_fired(&intent) {
                debug!(window_id = %intent.window_id, kind = %intent.kind, "Already fired, skipping");
                report.record_suppressed();
                continue;
            }

            let request = DeliveryRequest::for_window(intent.clone(), window, &self.recipient);
            let outcome = self.delivery.deliver(&request);
            if let DeliveryOutcome::Failed(reason) = &outcome {
                warn!(
                    window_id = %intent.window_id,
                    kind = %intent.kind,
                    delivery = self.delivery.name(),
                    "Delivery failed: {}",
                    reason
                );
            }
            report.record(&intent, &outcome);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{TimeRange, Weekday};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Records requests and fails for the configured window ids.
    #[derive(Default)]
    struct RecordingDelivery {
        requests: Mutex<Vec<DeliveryRequest>>,
        fail_for: Vec<String>,
    }

    impl Delivery for RecordingDelivery {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_for.contains(&request.intent.window_id) {
                DeliveryOutcome::Failed("smtp down".into())
            } else {
                DeliveryOutcome::Delivered
            }
        }
    }

    // 2024-01-01 was a Monday.
    fn monday(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn windows() -> Vec<QuietWindow> {
        vec![
            QuietWindow::new("bed", "Bedtime", vec![Weekday::Mon], TimeRange::from_hours(22, 6)),
            QuietWindow::new("late", "Late", vec![Weekday::Mon], TimeRange::from_hours(22, 23)),
            QuietWindow::new("tue", "Tuesday", vec![Weekday::Tue], TimeRange::from_hours(22, 23)),
        ]
    }

    // ==================== Dedup Tests ====================

    #[test]
    fn duplicate_window() {
        assert!(!is_duplicate(None, 1));
        assert!(is_duplicate(Some(Duration::zero()), 1));
        assert!(is_duplicate(Some(Duration::minutes(1)), 1));
        assert!(is_duplicate(Some(Duration::minutes(3)), 1));
        assert!(!is_duplicate(Some(Duration::minutes(4)), 1));
        assert!(!is_duplicate(Some(Duration::hours(24)), 1));
        assert!(is_duplicate(Some(Duration::seconds(-30)), 1));
        assert!(!is_duplicate(Some(Duration::minutes(-3)), 1));
    }

    // ==================== Dispatch Tests ====================

    #[test]
    fn tick_delivers_each_intent() {
        let delivery = RecordingDelivery::default();
        let dispatcher = Dispatcher::new(NotificationTrigger::default(), &delivery, "me@example.com");

        let report = dispatcher.run_tick(&windows(), monday(22, 0), |_| false);

        assert_eq!(report.windows_checked, 3);
        assert_eq!(report.notifications_sent, 2);
        assert_eq!(report.delivered(), 2);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.suppressed, 0);

        let requests = delivery.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].intent.window_id, "bed");
        assert_eq!(requests[0].recipient, "me@example.com");
        assert_eq!(requests[0].time, "22:00");
        assert_eq!(requests[1].intent.window_id, "late");
    }

    #[test]
    fn quiet_tick_produces_empty_report() {
        let delivery = RecordingDelivery::default();
        let dispatcher = Dispatcher::new(NotificationTrigger::default(), &delivery, "me");

        let report = dispatcher.run_tick(&windows(), monday(12, 0), |_| false);
        assert_eq!(report.notifications_sent, 0);
        assert!(report.results.is_empty());
        assert!(delivery.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn failures_are_reported_not_fatal() {
        let delivery = RecordingDelivery {
            fail_for: vec!["bed".into()],
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(NotificationTrigger::default(), &delivery, "me");

        let report = dispatcher.run_tick(&windows(), monday(22, 0), |_| false);
        assert_eq!(report.notifications_sent, 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.delivered(), 1);

        let failed = report.results.iter().find(|r| !r.success).unwrap();
        assert_eq!(failed.window_id, "bed");
        assert_eq!(failed.error.as_deref(), Some("smtp down"));
        assert_eq!(report.successes().count(), 1);
    }

    #[test]
    fn already_fired_intents_are_suppressed() {
        let delivery = RecordingDelivery::default();
        let dispatcher = Dispatcher::new(NotificationTrigger::default(), &delivery, "me");

        let report = dispatcher.run_tick(&windows(), monday(22, 1), |intent| intent.window_id == "bed");
        assert_eq!(report.suppressed, 1);
        assert_eq!(report.notifications_sent, 1);
        assert_eq!(report.results[0].window_id, "late");
    }

    #[test]
    fn report_serializes_like_monitor_response() {
        let delivery = RecordingDelivery {
            fail_for: vec!["late".into()],
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(NotificationTrigger::default(), &delivery, "me");
        let report = dispatcher.run_tick(&windows(), monday(22, 0), |_| false);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["windows_checked"], 3);
        assert_eq!(json["notifications_sent"], 2);
        assert_eq!(json["results"][0]["kind"], "start");
        assert!(json["results"][0].get("error").is_none());
        assert_eq!(json["results"][1]["error"], "smtp down");
    }
}
