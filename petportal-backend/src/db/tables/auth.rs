//! Login session and password reset token database operations

use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult};

use crate::models::Session;
use super::super::{parse_datetime, Database};

impl Database {
    // ============================================
    // Session methods
    // ============================================

    /// Create a new login session for a user
    pub fn create_session(&self, user_id: i64, token: &str, ttl: Duration) -> SqliteResult<Session> {
        let conn = self.conn();
        let now = Utc::now();
        let expires_at = now + ttl;

        conn.execute(
            "INSERT INTO auth_sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![token, user_id, now.to_rfc3339(), expires_at.to_rfc3339()],
        )?;

        Ok(Session {
            id: conn.last_insert_rowid(),
            token: token.to_string(),
            user_id,
            created_at: now,
            expires_at,
        })
    }

    /// Look up a session by token, ignoring expired ones
    pub fn validate_session(&self, token: &str) -> SqliteResult<Option<Session>> {
        let conn = self.conn();

        let session = conn
            .query_row(
                "SELECT id, token, user_id, created_at, expires_at FROM auth_sessions WHERE token = ?1",
                [token],
                |row| {
                    let created_at: String = row.get(3)?;
                    let expires_at: String = row.get(4)?;
                    Ok(Session {
                        id: row.get(0)?,
                        token: row.get(1)?,
                        user_id: row.get(2)?,
                        created_at: parse_datetime(3, &created_at)?,
                        expires_at: parse_datetime(4, &expires_at)?,
                    })
                },
            )
            .optional()?;

        Ok(session.filter(|s| !s.is_expired(Utc::now())))
    }

    /// Delete a session (logout)
    pub fn delete_session(&self, token: &str) -> SqliteResult<bool> {
        let conn = self.conn();
        let rows = conn.execute("DELETE FROM auth_sessions WHERE token = ?1", [token])?;
        Ok(rows > 0)
    }

    /// Delete every session belonging to a user
    pub fn delete_sessions_for_user(&self, user_id: i64) -> SqliteResult<usize> {
        let conn = self.conn();
        conn.execute("DELETE FROM auth_sessions WHERE user_id = ?1", [user_id])
    }

    /// Remove sessions that expired before `now`
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> SqliteResult<usize> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM auth_sessions WHERE expires_at < ?1",
            [now.to_rfc3339()],
        )
    }

    // ============================================
    // Password reset methods
    // ============================================

    pub fn create_password_reset_token(
        &self,
        user_id: i64,
        token: &str,
        ttl: Duration,
    ) -> SqliteResult<DateTime<Utc>> {
        let conn = self.conn();
        let now = Utc::now();
        let expires_at = now + ttl;

        conn.execute(
            "INSERT INTO password_reset_tokens (token, user_id, used, created_at, expires_at)
             VALUES (?1, ?2, 0, ?3, ?4)",
            rusqlite::params![token, user_id, now.to_rfc3339(), expires_at.to_rfc3339()],
        )?;

        Ok(expires_at)
    }

    /// Mark a reset token used and return its user id.
    /// Unknown, used and expired tokens yield `None`.
    pub fn consume_password_reset_token(&self, token: &str) -> SqliteResult<Option<i64>> {
        let conn = self.conn();

        let row: Option<(i64, bool, String)> = conn
            .query_row(
                "SELECT user_id, used, expires_at FROM password_reset_tokens WHERE token = ?1",
                [token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((user_id, used, expires_at)) = row else {
            return Ok(None);
        };
        if used || parse_datetime(2, &expires_at)? <= Utc::now() {
            return Ok(None);
        }

        conn.execute(
            "UPDATE password_reset_tokens SET used = 1 WHERE token = ?1",
            [token],
        )?;

        Ok(Some(user_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::{memory_databases, user};
    use chrono::{Duration, Utc};

    #[test]
    fn test_session_lifecycle() {
        let (db, _) = memory_databases();
        let alice = user(&db, "alice");

        db.create_session(alice.id, "tok-1", Duration::hours(1)).unwrap();
        let session = db.validate_session("tok-1").unwrap().unwrap();
        assert_eq!(session.user_id, alice.id);

        assert!(db.delete_session("tok-1").unwrap());
        assert!(db.validate_session("tok-1").unwrap().is_none());
        assert!(!db.delete_session("tok-1").unwrap());
    }

    #[test]
    fn test_expired_session_is_invalid() {
        let (db, _) = memory_databases();
        let alice = user(&db, "alice");

        db.create_session(alice.id, "old", Duration::hours(-1)).unwrap();
        assert!(db.validate_session("old").unwrap().is_none());
        assert_eq!(db.purge_expired_sessions(Utc::now()).unwrap(), 1);
    }

    #[test]
    fn test_reset_token_is_single_use() {
        let (db, _) = memory_databases();
        let alice = user(&db, "alice");

        db.create_password_reset_token(alice.id, "reset", Duration::hours(1)).unwrap();
        assert_eq!(db.consume_password_reset_token("reset").unwrap(), Some(alice.id));
        assert_eq!(db.consume_password_reset_token("reset").unwrap(), None);
        assert_eq!(db.consume_password_reset_token("unknown").unwrap(), None);

        db.create_password_reset_token(alice.id, "stale", Duration::hours(-1)).unwrap();
        assert_eq!(db.consume_password_reset_token("stale").unwrap(), None);
    }
}
