//! Session storage

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::users::user_from_row;
use super::{format_datetime, Database};
use crate::error::Result;
use crate::models::User;

impl Database {
    /// Store a session by token digest
    pub fn create_session(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (user_id, token_hash, expires_at) VALUES (?, ?, ?)",
            params![user_id, token_hash, format_datetime(expires_at)],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The user owning an unexpired session
    pub fn get_session_user(&self, token_hash: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                r#"
                SELECT u.id, u.name, u.email, u.avatar_link, u.role, u.is_banned,
                       u.ban_reason, u.banned_at, u.created_at
                FROM sessions s
                JOIN users u ON u.id = s.user_id
                WHERE s.token_hash = ? AND s.expires_at > ?
                "#,
                params![token_hash, format_datetime(Utc::now())],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE token_hash = ?",
            params![token_hash],
        )?;
        Ok(deleted > 0)
    }

    pub fn delete_user_sessions(&self, user_id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM sessions WHERE user_id = ?", params![user_id])?;
        Ok(deleted)
    }

    /// Remove expired sessions, returning how many were deleted
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?",
            params![format_datetime(Utc::now())],
        )?;
        Ok(deleted)
    }
}
