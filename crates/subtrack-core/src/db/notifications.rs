//! Notification feed

use rusqlite::{params, Connection};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Notification, NotificationKind};

/// Insert on an existing connection or transaction
pub(crate) fn insert_notification(
    conn: &Connection,
    user_id: i64,
    kind: NotificationKind,
    title: &str,
    message: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, kind, title, message) VALUES (?, ?, ?, ?)",
        params![user_id, kind.as_str(), title, message],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    pub fn create_notification(
        &self,
        user_id: i64,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) -> Result<i64> {
        let conn = self.conn()?;
        Ok(insert_notification(&conn, user_id, kind, title, message)?)
    }

    /// A user's notifications, newest first
    pub fn list_notifications(&self, user_id: i64, limit: i64) -> Result<Vec<Notification>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, kind, title, message, created_at
            FROM notifications
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let notifications = stmt
            .query_map(params![user_id, limit], |row| {
                let kind_str: String = row.get(2)?;
                let created_at_str: String = row.get(5)?;
                Ok(Notification {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    kind: kind_str.parse().unwrap_or(NotificationKind::Neutral),
                    title: row.get(3)?,
                    message: row.get(4)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(notifications)
    }
}
