//! Command implementations for the `quiet` binary.
//!
//! Each command writes its human-readable output to the given writer.

use std::collections::BTreeSet;
use std::io::Write;

use anyhow::{bail, Context};
use clap::{Args, Subcommand, ValueEnum};
use quiet_core::{
    active_windows, phase, EvaluationInstant, QuietWindow, TimeOfDay, Weekday, WindowError,
};
use quiet_storage::{Database, NewWindow, StoredWindow};

use crate::config::MonitorConfig;
use crate::monitor::Monitor;

/// Window templates for `add --preset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// 22:00 to 08:00, every day.
    Night,
}

impl Preset {
    fn window(&self) -> NewWindow {
        match self {
            Preset::Night => NewWindow::from(&QuietWindow::night("")),
        }
    }
}

/// Arguments for `quiet add`.
#[derive(Debug, Clone, Default, Args)]
pub struct AddArgs {
    /// Window name
    #[arg(long)]
    pub name: Option<String>,

    /// Start a window from a template
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Start time, HH:MM
    #[arg(long)]
    pub start: Option<String>,

    /// End time, HH:MM (earlier than start for overnight windows)
    #[arg(long)]
    pub end: Option<String>,

    /// Days: comma separated (mon,tue), or all, weekdays, weekends
    #[arg(long)]
    pub days: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Create the window disabled
    #[arg(long)]
    pub disabled: bool,

    /// Do not send notifications for this window
    #[arg(long)]
    pub no_notifications: bool,
}

/// Arguments for `quiet edit`. Omitted fields keep their value.
#[derive(Debug, Clone, Default, Args)]
pub struct EditArgs {
    /// Window id
    pub id: i64,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,

    #[arg(long)]
    pub days: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Turn notifications on or off
    #[arg(long)]
    pub notifications: Option<bool>,
}

/// `quiet config` actions.
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Print the monitor configuration
    Show,
    /// Set one field
    Set {
        /// Field name, e.g. interval_secs or delivery
        field: String,
        /// New value
        value: String,
    },
}

/// Parses a `--days` argument. Unlike stored records, unknown tokens are
/// rejected here.
pub fn parse_days_arg(s: &str) -> Result<BTreeSet<Weekday>, WindowError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "all" | "daily" => return Ok(Weekday::all().into_iter().collect()),
        "weekdays" => return Ok(Weekday::weekdays().into_iter().collect()),
        "weekends" => return Ok(Weekday::weekends().into_iter().collect()),
        _ => {}
    }

    let days = s
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| Weekday::from_token(token).ok_or_else(|| WindowError::UnknownDay(token.to_string())))
        .collect::<Result<BTreeSet<_>, _>>()?;

    if days.is_empty() {
        return Err(WindowError::NoDays);
    }
    Ok(days)
}

fn window_line(stored: &StoredWindow) -> String {
    let state = if stored.enabled { "on " } else { "off" };
    let bell = if stored.notifications_enabled { "" } else { " (silent)" };
    format!(
        "[{}] {} {} {}-{} {}{}",
        stored.id,
        state,
        stored.name,
        stored.start_time,
        stored.end_time,
        stored.days_of_week.join(", "),
        bell
    )
}

/// `quiet list`
pub fn list(db: &Database, config: &MonitorConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    let windows = db.windows_for_owner(&config.owner)?;
    if windows.is_empty() {
        writeln!(out, "No quiet hours windows. Add one with `quiet add`.")?;
        return Ok(());
    }

    for stored in &windows {
        writeln!(out, "{}", window_line(stored))?;
        if let Some(description) = &stored.description {
            writeln!(out, "      {}", description)?;
        }
    }
    Ok(())
}

/// `quiet status [--at "<day> HH:MM"]`
pub fn status(
    db: &Database,
    config: &MonitorConfig,
    at: Option<&str>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let instant = match at {
        Some(s) => EvaluationInstant::parse(s)?,
        None => EvaluationInstant::now(),
    };
    let windows = db.quiet_windows(&config.owner)?;

    writeln!(out, "Quiet hours at {}", instant)?;
    if windows.is_empty() {
        writeln!(out, "  no windows")?;
        return Ok(());
    }

    let active = active_windows(&windows, instant);
    for window in &windows {
        let is_on = active.iter().any(|w| w.id == window.id);
        let current = phase(window, instant, config.reminder_lead_minutes);
        let marker = if is_on { "  <- Currently Active" } else { "" };
        let label = if window.enabled {
            current.label()
        } else {
            "disabled"
        };
        writeln!(
            out,
            "  [{}] {} ({}, {}): {}{}",
            window.id,
            window.name,
            window.time_range,
            window.days_label(),
            label,
            marker
        )?;
    }

    let enabled = windows.iter().filter(|w| w.enabled).count();
    writeln!(
        out,
        "Windows: {} total, {} enabled, {} currently active",
        windows.len(),
        enabled,
        active.len()
    )?;
    if !active.is_empty() {
        writeln!(out, "Quiet hours are on.")?;
    } else {
        writeln!(out, "Quiet hours are off.")?;
    }
    Ok(())
}

fn parse_time(s: &str) -> anyhow::Result<TimeOfDay> {
    TimeOfDay::parse(s).with_context(|| format!("Invalid time '{}', expected HH:MM", s))
}

/// `quiet add`
pub fn add(
    db: &Database,
    config: &MonitorConfig,
    args: AddArgs,
    out: &mut dyn Write,
) -> anyhow::Result<StoredWindow> {
    let mut window = match args.preset {
        Some(preset) => preset.window(),
        None => {
            let (Some(start), Some(end)) = (&args.start, &args.end) else {
                bail!("--start and --end are required without --preset");
            };
            NewWindow::new(
                args.name.clone().unwrap_or_default(),
                parse_time(start)?,
                parse_time(end)?,
                Weekday::all(),
            )
        }
    };

    if let Some(name) = args.name {
        window.name = name;
    }
    if let Some(start) = &args.start {
        window.start_time = parse_time(start)?;
    }
    if let Some(end) = &args.end {
        window.end_time = parse_time(end)?;
    }
    if let Some(days) = &args.days {
        window.days = parse_days_arg(days)?;
    }
    window.description = args.description;
    window.enabled = !args.disabled;
    window.notifications_enabled = !args.no_notifications;

    let stored = db.create_window(&config.owner, &window)?;
    writeln!(out, "Created {}", window_line(&stored))?;
    Ok(stored)
}

/// `quiet edit`
pub fn edit(db: &Database, args: EditArgs, out: &mut dyn Write) -> anyhow::Result<StoredWindow> {
    let existing = db
        .get_window(args.id)?
        .with_context(|| format!("No window with id {}", args.id))?;
    let mut window = NewWindow::from(&existing.to_quiet_window()?);

    if let Some(name) = args.name {
        window.name = name;
    }
    if let Some(start) = &args.start {
        window.start_time = parse_time(start)?;
    }
    if let Some(end) = &args.end {
        window.end_time = parse_time(end)?;
    }
    if let Some(days) = &args.days {
        window.days = parse_days_arg(days)?;
    }
    if let Some(description) = args.description {
        window.description = Some(description).filter(|d| !d.trim().is_empty());
    }
    if let Some(notifications) = args.notifications {
        window.notifications_enabled = notifications;
    }

    let stored = db.update_window(args.id, &window)?;
    writeln!(out, "Updated {}", window_line(&stored))?;
    Ok(stored)
}

/// `quiet toggle`: flips the enabled flag.
pub fn toggle(db: &Database, id: i64, out: &mut dyn Write) -> anyhow::Result<StoredWindow> {
    let existing = db
        .get_window(id)?
        .with_context(|| format!("No window with id {}", id))?;
    let stored = db.set_window_enabled(id, !existing.enabled)?;
    let state = if stored.enabled { "enabled" } else { "disabled" };
    writeln!(out, "Window \"{}\" {}", stored.name, state)?;
    Ok(stored)
}

/// `quiet remove`
pub fn remove(db: &Database, id: i64, out: &mut dyn Write) -> anyhow::Result<()> {
    let removed = db.delete_window(id)?;
    writeln!(out, "Removed window \"{}\"", removed.name)?;
    Ok(())
}

/// `quiet logs [--prune-days N]`
pub fn logs(
    db: &Database,
    config: &MonitorConfig,
    prune_days: Option<u32>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    if let Some(days) = prune_days {
        let before = chrono::Utc::now() - chrono::Duration::days(i64::from(days));
        let removed = db.prune_logs(before)?;
        writeln!(out, "Removed {} entries older than {} days", removed, days)?;
        return Ok(());
    }

    let entries = db.recent_logs(&config.owner)?;
    if entries.is_empty() {
        writeln!(out, "No activity yet.")?;
    }
    for entry in entries {
        writeln!(
            out,
            "{}  {:<17}  {}",
            entry
                .created_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M"),
            entry.action.as_str(),
            entry.details.unwrap_or_default()
        )?;
    }
    Ok(())
}

/// `quiet tick`: one pass, report printed as JSON.
pub fn tick(monitor: &Monitor, out: &mut dyn Write) -> anyhow::Result<()> {
    let report = monitor.run_tick()?;
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

/// `quiet config ...`
pub fn config(db: &Database, action: ConfigAction, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut config = MonitorConfig::load(db)?;
    match action {
        ConfigAction::Show => {
            writeln!(out, "{}", serde_json::to_string_pretty(&config)?)?;
        }
        ConfigAction::Set { field, value } => {
            config.set_field(&field, &value).with_context(|| {
                format!("Known fields: {}", MonitorConfig::FIELDS.join(", "))
            })?;
            config.save(db)?;
            writeln!(out, "{} updated", field)?;
        }
    }
    Ok(())
}
