//! Activity log repository.

use chrono::{DateTime, Utc};
use quiet_core::NotificationKind;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::parse_datetime;
use crate::error::Result;
use crate::models::{LogAction, LogEntry, NewLogEntry};

/// Repository for activity log operations.
pub struct LogsRepo;

impl LogsRepo {
    /// Append an entry stamped with `at`.
    pub fn insert(conn: &Connection, entry: &NewLogEntry, at: DateTime<Utc>) -> Result<i64> {
        conn.execute(
            "INSERT INTO window_logs (owner, window_id, action, kind, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.owner,
                entry.window_id,
                entry.action.as_str(),
                entry.kind.map(|k| k.as_str()),
                entry.details,
                at.to_rfc3339(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Most recent entries of an owner, newest first.
    pub fn recent(conn: &Connection, owner: &str, limit: i64) -> Result<Vec<LogEntry>> {
        let mut stmt = conn.prepare(
            "SELECT id, owner, window_id, action, kind, details, created_at
             FROM window_logs WHERE owner = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;

        let entries = stmt
            .query_map(params![owner, limit], row_to_entry)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(entries)
    }

    /// When a notification of `kind` was last sent for a window.
    pub fn last_notification(
        conn: &Connection,
        window_id: &str,
        kind: NotificationKind,
    ) -> Result<Option<DateTime<Utc>>> {
        let created_at: Option<String> = conn
            .query_row(
                "SELECT created_at FROM window_logs
                 WHERE window_id = ?1 AND kind = ?2 AND action = ?3
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![
                    window_id,
                    kind.as_str(),
                    LogAction::NotificationSent.as_str()
                ],
                |row| row.get(0),
            )
            .optional()?;

        Ok(created_at.map(|s| parse_datetime(&s)))
    }

    /// Delete entries older than `before`. Returns the number removed.
    pub fn prune(conn: &Connection, before: DateTime<Utc>) -> Result<usize> {
        let deleted = conn.execute(
            "DELETE FROM window_logs WHERE created_at < ?1",
            [before.to_rfc3339()],
        )?;
        Ok(deleted)
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    let action_str: String = row.get(3)?;
    let kind_str: Option<String> = row.get(4)?;
    Ok(LogEntry {
        id: row.get(0)?,
        owner: row.get(1)?,
        window_id: row.get(2)?,
        action: LogAction::parse(&action_str).unwrap_or(LogAction::Updated),
        kind: kind_str.as_deref().and_then(NotificationKind::parse),
        details: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::run_migrations;
    use chrono::Duration;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn entry(window_id: &str, action: LogAction, kind: Option<NotificationKind>) -> NewLogEntry {
        NewLogEntry {
            owner: "local".to_string(),
            window_id: window_id.to_string(),
            action,
            kind,
            details: Some(format!("{} {}", window_id, action.as_str())),
        }
    }

    #[test]
    fn test_recent_is_newest_first() {
        let conn = setup_db();
        let base = Utc::now() - Duration::hours(1);

        for (i, action) in [LogAction::Created, LogAction::Updated, LogAction::Deleted]
            .into_iter()
            .enumerate()
        {
            LogsRepo::insert(&conn, &entry("1", action, None), base + Duration::minutes(i as i64))
                .unwrap();
        }

        let entries = LogsRepo::recent(&conn, "local", 50).unwrap();
        let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![LogAction::Deleted, LogAction::Updated, LogAction::Created]
        );
    }

    #[test]
    fn test_recent_respects_limit_and_owner() {
        let conn = setup_db();
        let now = Utc::now();

        for _ in 0..5 {
            LogsRepo::insert(&conn, &entry("1", LogAction::Updated, None), now).unwrap();
        }
        let mut foreign = entry("9", LogAction::Created, None);
        foreign.owner = "someone".to_string();
        LogsRepo::insert(&conn, &foreign, now).unwrap();

        assert_eq!(LogsRepo::recent(&conn, "local", 3).unwrap().len(), 3);
        assert_eq!(LogsRepo::recent(&conn, "someone", 50).unwrap().len(), 1);
    }

    #[test]
    fn test_last_notification() {
        let conn = setup_db();
        let earlier = Utc::now() - Duration::days(1);
        let later = Utc::now() - Duration::minutes(1);

        assert!(LogsRepo::last_notification(&conn, "1", NotificationKind::Start)
            .unwrap()
            .is_none());

        let sent = entry("1", LogAction::NotificationSent, Some(NotificationKind::Start));
        LogsRepo::insert(&conn, &sent, earlier).unwrap();
        LogsRepo::insert(&conn, &sent, later).unwrap();
        LogsRepo::insert(
            &conn,
            &entry("1", LogAction::NotificationSent, Some(NotificationKind::End)),
            Utc::now(),
        )
        .unwrap();

        let last = LogsRepo::last_notification(&conn, "1", NotificationKind::Start)
            .unwrap()
            .unwrap();
        assert_eq!(last.timestamp(), later.timestamp());

        assert!(LogsRepo::last_notification(&conn, "2", NotificationKind::Start)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_last_notification_reports_database_errors() {
        let conn = setup_db();
        conn.execute("DROP TABLE window_logs", []).unwrap();

        let result = LogsRepo::last_notification(&conn, "1", NotificationKind::Start);
        assert!(result.is_err());
    }

    #[test]
    fn test_entries_round_trip_kind() {
        let conn = setup_db();
        LogsRepo::insert(
            &conn,
            &entry("4", LogAction::NotificationSent, Some(NotificationKind::Reminder)),
            Utc::now(),
        )
        .unwrap();

        let entries = LogsRepo::recent(&conn, "local", 10).unwrap();
        assert_eq!(entries[0].kind, Some(NotificationKind::Reminder));
        assert_eq!(entries[0].window_id, "4");
    }

    #[test]
    fn test_prune() {
        let conn = setup_db();
        let now = Utc::now();

        LogsRepo::insert(&conn, &entry("1", LogAction::Created, None), now - Duration::days(60))
            .unwrap();
        LogsRepo::insert(&conn, &entry("1", LogAction::Updated, None), now).unwrap();

        let removed = LogsRepo::prune(&conn, now - Duration::days(30)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(LogsRepo::recent(&conn, "local", 50).unwrap().len(), 1);
    }
}
