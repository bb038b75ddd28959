//! Notification database operations

use chrono::Utc;
use rusqlite::Result as SqliteResult;

use crate::models::{NewNotification, Notification};
use super::super::{parse_datetime, Database};

impl Database {
    pub fn create_notification(&self, notification: &NewNotification) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO notifications (user_id, actor_id, verb, message, url, unread, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            rusqlite::params![
                notification.user_id,
                notification.actor_id,
                &notification.verb,
                &notification.message,
                &notification.url,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// A user's notifications, newest first
    pub fn list_notifications(&self, user_id: i64) -> SqliteResult<Vec<Notification>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, actor_id, verb, message, url, unread, created_at
             FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;

        let notifications = stmt
            .query_map([user_id], |row| {
                let created_at: String = row.get(7)?;
                Ok(Notification {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    actor_id: row.get(2)?,
                    verb: row.get(3)?,
                    message: row.get(4)?,
                    url: row.get(5)?,
                    unread: row.get(6)?,
                    created_at: parse_datetime(7, &created_at)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(notifications)
    }

    pub fn count_unread_notifications(&self, user_id: i64) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND unread = 1",
            [user_id],
            |row| row.get(0),
        )
    }

    /// Mark one of the user's notifications read; false if it isn't theirs
    pub fn mark_notification_read(&self, id: i64, user_id: i64) -> SqliteResult<bool> {
        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE notifications SET unread = 0 WHERE id = ?1 AND user_id = ?2",
            [id, user_id],
        )?;
        Ok(rows > 0)
    }
}
