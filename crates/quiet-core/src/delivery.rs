//! Delivery of notification intents.
//!
//! The trigger only decides *that* a notification is due. A [`Delivery`]
//! implementation turns a [`DeliveryRequest`] into something the user sees
//! and reports back a [`DeliveryOutcome`]. Two implementations ship here:
//!
//! - [`DesktopDelivery`] shows a desktop notification (feature `notifications`)
//! - [`LogDelivery`] writes the message to the tracing log
//!
//! Failures are reported, never retried.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::trigger::{NotificationIntent, NotificationKind, DEFAULT_REMINDER_LEAD_MINUTES};
use crate::window::QuietWindow;

/// Everything a delivery needs to present one intent.
///
/// Display fields are denormalized from the window by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    pub intent: NotificationIntent,
    pub window_name: String,
    /// Human-readable time, `"HH:MM"`.
    pub time: String,
    pub recipient: String,
}

impl DeliveryRequest {
    /// Builds a request for an intent raised by `window`.
    ///
    /// Start and reminder notifications show the start time; end
    /// notifications show the end time.
    pub fn for_window(
        intent: NotificationIntent,
        window: &QuietWindow,
        recipient: impl Into<String>,
    ) -> Self {
        let time = match intent.kind {
            NotificationKind::Start | NotificationKind::Reminder => window.start(),
            NotificationKind::End => window.end(),
        };

        Self {
            intent,
            window_name: window.name.clone(),
            time: time.to_string(),
            recipient: recipient.into(),
        }
    }
}

/// Subject and body text for a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
}

impl NotificationMessage {
    /// Composes the text for a request.
    pub fn compose(request: &DeliveryRequest, reminder_lead_minutes: u16) -> Self {
        let name = if request.window_name.trim().is_empty() {
            "Your schedule"
        } else {
            request.window_name.as_str()
        };

        match request.intent.kind {
            NotificationKind::Start => Self {
                subject: format!("Quiet Hours Started: {}", name),
                body: format!(
                    "{} is now active at {}.\nYour quiet hours period has begun.",
                    name, request.time
                ),
            },
            NotificationKind::End => Self {
                subject: format!("Quiet Hours Ended: {}", name),
                body: format!(
                    "{} has completed at {}.\nYou can now resume your regular activities.",
                    name, request.time
                ),
            },
            NotificationKind::Reminder => Self {
                subject: format!(
                    "Reminder: Quiet Hours in {} minutes",
                    reminder_lead_minutes
                ),
                body: format!(
                    "{} will begin in approximately {} minutes at {}.",
                    name, reminder_lead_minutes, request.time
                ),
            },
        }
    }
}

/// Result of attempting a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The notification was handed off successfully.
    Delivered,
    /// The notification could not be delivered.
    Failed(String),
}

impl DeliveryOutcome {
    /// Returns true if the notification was delivered.
    pub fn was_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }

    /// The failure reason, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Delivered => None,
            DeliveryOutcome::Failed(reason) => Some(reason),
        }
    }
}

/// Something that can deliver notifications.
pub trait Delivery: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Delivers one request.
    fn deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome;
}

/// Writes notifications to the log instead of showing them.
#[derive(Debug, Clone, Copy)]
pub struct LogDelivery {
    reminder_lead_minutes: u16,
}

impl LogDelivery {
    pub fn new(reminder_lead_minutes: u16) -> Self {
        Self {
            reminder_lead_minutes,
        }
    }
}

impl Default for LogDelivery {
    fn default() -> Self {
        Self::new(DEFAULT_REMINDER_LEAD_MINUTES)
    }
}

impl Delivery for LogDelivery {
    fn name(&self) -> &'static str {
        "log"
    }

    fn deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        let message = NotificationMessage::compose(request, self.reminder_lead_minutes);
        info!(
            recipient = %request.recipient,
            window_id = %request.intent.window_id,
            kind = %request.intent.kind,
            "{}: {}",
            message.subject,
            message.body.replace('\n', " ")
        );
        DeliveryOutcome::Delivered
    }
}

/// Shows notifications on the desktop.
#[derive(Debug, Clone, Copy)]
pub struct DesktopDelivery {
    reminder_lead_minutes: u16,
}

impl DesktopDelivery {
    pub fn new(reminder_lead_minutes: u16) -> Self {
        Self {
            reminder_lead_minutes,
        }
    }

    /// Sends the actual notification using platform-specific API.
    #[cfg(feature = "notifications")]
    fn show(&self, message: &NotificationMessage) -> DeliveryOutcome {
        use notify_rust::Notification;

        match Notification::new()
            .summary(&message.subject)
            .body(&message.body)
            .appname("Quiet Hours")
            .timeout(notify_rust::Timeout::Milliseconds(5000))
            .show()
        {
            Ok(_) => DeliveryOutcome::Delivered,
            Err(e) => DeliveryOutcome::Failed(e.to_string()),
        }
    }

    /// Fallback when notifications feature is disabled.
    #[cfg(not(feature = "notifications"))]
    fn show(&self, _message: &NotificationMessage) -> DeliveryOutcome {
        DeliveryOutcome::Failed("desktop notifications are not compiled in".to_string())
    }
}

impl Default for DesktopDelivery {
    fn default() -> Self {
        Self::new(DEFAULT_REMINDER_LEAD_MINUTES)
    }
}

impl Delivery for DesktopDelivery {
    fn name(&self) -> &'static str {
        "desktop"
    }

    fn deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        let message = NotificationMessage::compose(request, self.reminder_lead_minutes);
        self.show(&message)
    }
}
