//! Monitor configuration, stored in the database under [`MONITOR_CONFIG_KEY`].

use std::time::Duration;

use quiet_core::{
    Delivery, DesktopDelivery, LogDelivery, TriggerConfig, DEFAULT_REMINDER_LEAD_MINUTES,
    DEFAULT_TOLERANCE_MINUTES, MINUTES_PER_DAY,
};
use quiet_storage::Database;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config key the monitor settings live under.
pub const MONITOR_CONFIG_KEY: &str = "monitor";

/// Owner used when none is configured.
pub const DEFAULT_OWNER: &str = "local";

/// Default seconds between ticks.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Errors from editing the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown config field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// How due notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKind {
    /// Desktop notification.
    Desktop,
    /// Log line only.
    Log,
}

impl DeliveryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryKind::Desktop => "desktop",
            DeliveryKind::Log => "log",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Some(DeliveryKind::Desktop),
            "log" => Some(DeliveryKind::Log),
            _ => None,
        }
    }
}

impl Default for DeliveryKind {
    fn default() -> Self {
        if cfg!(feature = "notifications") {
            DeliveryKind::Desktop
        } else {
            DeliveryKind::Log
        }
    }
}

/// Settings for the notification monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Address placed on delivery requests; the owner when unset.
    pub recipient: Option<String>,
    /// Whose windows are evaluated.
    pub owner: String,
    /// Seconds between ticks.
    pub interval_secs: u64,
    pub reminder_lead_minutes: u16,
    pub tolerance_minutes: u16,
    pub delivery: DeliveryKind,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            recipient: None,
            owner: DEFAULT_OWNER.to_string(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            reminder_lead_minutes: DEFAULT_REMINDER_LEAD_MINUTES,
            tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
            delivery: DeliveryKind::default(),
        }
    }
}

impl MonitorConfig {
    /// Fields accepted by [`MonitorConfig::set_field`].
    pub const FIELDS: [&'static str; 6] = [
        "recipient",
        "owner",
        "interval_secs",
        "reminder_lead_minutes",
        "tolerance_minutes",
        "delivery",
    ];

    /// Loads the stored config, falling back to defaults.
    pub fn load(db: &Database) -> quiet_storage::Result<Self> {
        db.get_config_or_default(MONITOR_CONFIG_KEY, Self::default())
    }

    /// Stores the config.
    pub fn save(&self, db: &Database) -> quiet_storage::Result<()> {
        db.set_config_typed(MONITOR_CONFIG_KEY, self)
    }

    /// Thresholds for the trigger.
    pub fn trigger_config(&self) -> TriggerConfig {
        TriggerConfig {
            reminder_lead_minutes: self.reminder_lead_minutes,
            tolerance_minutes: self.tolerance_minutes,
        }
    }

    /// Who notifications are addressed to.
    pub fn recipient(&self) -> &str {
        self.recipient.as_deref().unwrap_or(&self.owner)
    }

    /// Time between ticks, at least one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// The configured delivery.
    pub fn delivery(&self) -> Box<dyn Delivery> {
        match self.delivery {
            DeliveryKind::Desktop => Box::new(DesktopDelivery::new(self.reminder_lead_minutes)),
            DeliveryKind::Log => Box::new(LogDelivery::new(self.reminder_lead_minutes)),
        }
    }

    /// Sets one field from its text form.
    ///
    /// An empty or `none` value clears `recipient`.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };

        match field {
            "recipient" => {
                let value = value.trim();
                self.recipient = if value.is_empty() || value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "owner" => {
                let value = value.trim();
                if value.is_empty() {
                    return Err(invalid());
                }
                self.owner = value.to_string();
            }
            "interval_secs" => {
                self.interval_secs = value
                    .trim()
                    .parse()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(invalid)?;
            }
            "reminder_lead_minutes" => {
                self.reminder_lead_minutes = value
                    .trim()
                    .parse()
                    .ok()
                    .filter(|m| *m < MINUTES_PER_DAY)
                    .ok_or_else(invalid)?;
            }
            "tolerance_minutes" => {
                self.tolerance_minutes = value
                    .trim()
                    .parse()
                    .ok()
                    .filter(|m| *m < MINUTES_PER_DAY / 2)
                    .ok_or_else(invalid)?;
            }
            "delivery" => {
                self.delivery = DeliveryKind::parse(value).ok_or_else(invalid)?;
            }
            _ => return Err(ConfigError::UnknownField(field.to_string())),
        }

        Ok(())
    }
}
