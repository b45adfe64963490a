//! The notification monitor: periodic ticks against the stored windows.
//!
//! Each tick loads the owner's windows, asks the core dispatcher which
//! notifications are due, suppresses those already recorded as sent for the
//! same occurrence, delivers the rest and records every successful delivery
//! in the activity log. Failed deliveries are not recorded, so they are
//! retried on the next tick while still within tolerance.
//!
//! A notification whose history cannot be read is held back for that tick
//! rather than risk a repeat. A delivery that cannot be recorded is logged
//! and still reported.

use std::future::Future;

use chrono::{DateTime, Local, TimeZone, Utc};
use quiet_core::{is_duplicate, Delivery, Dispatcher, NotificationTrigger, TickReport};
use quiet_storage::Database;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;

/// Runs ticks for one owner.
pub struct Monitor {
    db: Database,
    config: MonitorConfig,
    delivery: Box<dyn Delivery>,
}

impl Monitor {
    /// Creates a monitor using the configured delivery.
    pub fn new(db: Database, config: MonitorConfig) -> Self {
        let delivery = config.delivery();
        Self::with_delivery(db, config, delivery)
    }

    /// Creates a monitor with an explicit delivery.
    pub fn with_delivery(db: Database, config: MonitorConfig, delivery: Box<dyn Delivery>) -> Self {
        Self {
            db,
            config,
            delivery,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Runs one tick at the current local time.
    pub fn run_tick(&self) -> quiet_storage::Result<TickReport> {
        self.run_tick_at(&Local::now())
    }

    /// Runs one tick at `now`, evaluated in `now`'s own civil time.
    pub fn run_tick_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> quiet_storage::Result<TickReport> {
        let owner = self.config.owner.as_str();
        let recipient = self.config.recipient();
        let sent_at = now.with_timezone(&Utc);
        let tolerance = self.config.tolerance_minutes;

        let windows = self.db.quiet_windows(owner)?;
        let trigger = NotificationTrigger::new(self.config.trigger_config());
        let dispatcher = Dispatcher::new(trigger, self.delivery.as_ref(), recipient);

        let report = dispatcher.run_tick(&windows, now.naive_local(), |intent| {
            match self.db.last_notification(&intent.window_id, intent.kind) {
                Ok(last) => is_duplicate(last.map(|at| sent_at - at), tolerance),
                Err(e) => {
                    warn!(
                        window_id = %intent.window_id,
                        kind = intent.kind.as_str(),
                        "Could not check notification history, holding back: {}",
                        e
                    );
                    true
                }
            }
        });

        for result in report.successes() {
            if let Err(e) =
                self.db
                    .log_notification(owner, &result.window_id, result.kind, recipient, sent_at)
            {
                warn!(
                    window_id = %result.window_id,
                    kind = result.kind.as_str(),
                    "Could not record delivered notification: {}",
                    e
                );
            }
        }

        if report.notifications_sent > 0 || report.suppressed > 0 {
            info!(
                windows = report.windows_checked,
                delivered = report.delivered(),
                failed = report.failed(),
                suppressed = report.suppressed,
                "Tick complete"
            );
        } else {
            debug!(windows = report.windows_checked, "Tick complete, nothing due");
        }

        Ok(report)
    }

    /// Ticks every configured interval until `shutdown` resolves.
    ///
    /// The first tick runs immediately. A failed tick is logged and the loop
    /// continues. Returns the number of ticks run.
    pub async fn run<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            owner = %self.config.owner,
            interval_secs = self.config.interval().as_secs(),
            delivery = self.delivery.name(),
            "Monitor started"
        );

        let mut ticks = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    ticks += 1;
                    if let Err(e) = self.run_tick() {
                        error!("Tick failed: {}", e);
                    }
                }
            }
        }

        info!(ticks, "Monitor stopped");
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiet_core::{DeliveryOutcome, DeliveryRequest, NotificationKind, TimeOfDay, Weekday};
    use quiet_storage::{LogAction, NewWindow, StoredWindow};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<DeliveryRequest>>,
        fail: Mutex<bool>,
    }

    struct FakeDelivery(Arc<Recorder>);

    impl Delivery for FakeDelivery {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome {
            self.0.requests.lock().unwrap().push(request.clone());
            if *self.0.fail.lock().unwrap() {
                DeliveryOutcome::Failed("offline".into())
            } else {
                DeliveryOutcome::Delivered
            }
        }
    }

    fn setup() -> (Monitor, Arc<Recorder>, StoredWindow) {
        monitor_for(Database::in_memory().unwrap())
    }

    fn monitor_for(db: Database) -> (Monitor, Arc<Recorder>, StoredWindow) {
        let stored = db
            .create_window(
                "local",
                &NewWindow::new(
                    "Night",
                    TimeOfDay::new(22, 0),
                    TimeOfDay::new(8, 0),
                    Weekday::all(),
                ),
            )
            .unwrap();

        let mut config = MonitorConfig::default();
        config.recipient = Some("me@example.com".into());

        let recorder = Arc::new(Recorder::default());
        let monitor = Monitor::with_delivery(db, config, Box::new(FakeDelivery(recorder.clone())));
        (monitor, recorder, stored)
    }

    // 2024-03-04 is a Monday.
    fn monday(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    #[test]
    fn delivers_start_and_records_it() {
        let (monitor, recorder, stored) = setup();

        let report = monitor.run_tick_at(&monday(22, 0)).unwrap();
        assert_eq!(report.windows_checked, 1);
        assert_eq!(report.notifications_sent, 1);
        assert_eq!(report.results[0].kind, NotificationKind::Start);

        let requests = recorder.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].recipient, "me@example.com");
        assert_eq!(requests[0].time, "22:00");

        let last = monitor
            .db
            .last_notification(&stored.id.to_string(), NotificationKind::Start)
            .unwrap();
        assert_eq!(last, Some(monday(22, 0)));

        let sent: Vec<_> = monitor
            .db
            .recent_logs("local")
            .unwrap()
            .into_iter()
            .filter(|e| e.action == LogAction::NotificationSent)
            .collect();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].details.as_deref(),
            Some("start notification sent to me@example.com")
        );
    }

    #[test]
    fn suppresses_repeats_within_tolerance_band() {
        let (monitor, recorder, _) = setup();

        monitor.run_tick_at(&monday(21, 59)).unwrap();
        let second = monitor.run_tick_at(&monday(22, 0)).unwrap();
        let third = monitor.run_tick_at(&monday(22, 1)).unwrap();

        assert_eq!(second.suppressed, 1);
        assert_eq!(third.suppressed, 1);
        assert_eq!(recorder.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn next_day_occurrence_is_delivered() {
        let (monitor, recorder, _) = setup();

        monitor.run_tick_at(&monday(22, 0)).unwrap();
        let tuesday = monday(22, 0) + Duration::days(1);
        let report = monitor.run_tick_at(&tuesday).unwrap();

        assert_eq!(report.suppressed, 0);
        assert_eq!(report.delivered(), 1);
        assert_eq!(recorder.requests.lock().unwrap().len(), 2);
    }

    #[test]
    fn failed_delivery_is_retried() {
        let (monitor, recorder, _) = setup();

        *recorder.fail.lock().unwrap() = true;
        let report = monitor.run_tick_at(&monday(7, 59)).unwrap();
        assert_eq!(report.failed(), 1);
        assert!(monitor
            .db
            .recent_logs("local")
            .unwrap()
            .iter()
            .all(|e| e.action != LogAction::NotificationSent));

        *recorder.fail.lock().unwrap() = false;
        let report = monitor.run_tick_at(&monday(8, 0)).unwrap();
        assert_eq!(report.suppressed, 0);
        assert_eq!(report.delivered(), 1);
        assert_eq!(report.results[0].kind, NotificationKind::End);
    }

    #[test]
    fn reminder_uses_configured_lead() {
        let (mut monitor, recorder, _) = setup();
        monitor.config.reminder_lead_minutes = 30;

        let report = monitor.run_tick_at(&monday(21, 30)).unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].kind, NotificationKind::Reminder);
        assert_eq!(recorder.requests.lock().unwrap()[0].time, "22:00");
    }

    #[test]
    fn quiet_minute_sends_nothing() {
        let (monitor, recorder, _) = setup();

        let report = monitor.run_tick_at(&monday(13, 0)).unwrap();
        assert_eq!(report.notifications_sent, 0);
        assert!(recorder.requests.lock().unwrap().is_empty());
    }

    /// A file-backed monitor plus a second connection to the same file.
    fn on_disk() -> (TempDir, rusqlite::Connection, Monitor, Arc<Recorder>) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quiet.db");
        let (monitor, recorder, _) = monitor_for(Database::with_path(&path).unwrap());
        let conn = rusqlite::Connection::open(&path).unwrap();
        (dir, conn, monitor, recorder)
    }

    #[test]
    fn unreadable_history_holds_notification_back() {
        let (_dir, conn, monitor, recorder) = on_disk();
        conn.execute_batch("ALTER TABLE window_logs RENAME TO window_logs_moved;")
            .unwrap();

        let report = monitor.run_tick_at(&monday(22, 0)).unwrap();
        assert_eq!(report.suppressed, 1);
        assert_eq!(report.notifications_sent, 0);
        assert!(recorder.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn unrecorded_delivery_still_reported() {
        let (_dir, conn, monitor, recorder) = on_disk();
        conn.execute_batch(
            "CREATE TRIGGER reject_logs BEFORE INSERT ON window_logs
             BEGIN SELECT RAISE(ABORT, 'read only log'); END;",
        )
        .unwrap();

        let report = monitor.run_tick_at(&monday(22, 0)).unwrap();
        assert_eq!(report.delivered(), 1);
        assert_eq!(recorder.requests.lock().unwrap().len(), 1);
        assert!(monitor
            .db
            .recent_logs("local")
            .unwrap()
            .iter()
            .all(|e| e.action != LogAction::NotificationSent));
    }

    #[test]
    fn run_returns_immediately_on_shutdown() {
        let (monitor, recorder, _) = setup();

        let ticks = tokio_test::block_on(monitor.run(std::future::ready(())));
        assert_eq!(ticks, 0);
        assert!(recorder.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_ticks_until_shutdown() {
        let (monitor, _, _) = setup();

        let ticks = monitor
            .run(tokio::time::sleep(std::time::Duration::from_millis(50)))
            .await;
        assert!(ticks >= 1);
    }
}
