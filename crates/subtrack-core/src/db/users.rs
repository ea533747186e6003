//! User account operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Role, User, UserFilter};

const USER_COLUMNS: &str =
    "id, name, email, avatar_link, role, is_banned, ban_reason, banned_at, created_at";

/// A user together with the stored password hash, for login
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(4)?;
    let banned_at_str: Option<String> = row.get(7)?;
    let created_at_str: String = row.get(8)?;

    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        avatar_link: row.get(3)?,
        role: role_str.parse().unwrap_or_default(),
        is_banned: row.get(5)?,
        ban_reason: row.get(6)?,
        banned_at: banned_at_str.map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Create a user; the email must be unused (case-insensitive)
    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<i64> {
        let conn = self.conn()?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? COLLATE NOCASE)",
            params![email],
            |row| row.get(0),
        )?;
        if exists {
            return Err(Error::Conflict(format!("Email {} is already registered", email)));
        }

        conn.execute(
            "INSERT INTO users (name, email, password_hash, role) VALUES (?, ?, ?, ?)",
            params![name, email, password_hash, role.as_str()],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!(
                    "SELECT {} FROM users WHERE email = ? COLLATE NOCASE",
                    USER_COLUMNS
                ),
                params![email.trim()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Look up a user with their password hash
    pub fn get_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        let conn = self.conn()?;
        let credentials = conn
            .query_row(
                &format!(
                    "SELECT {}, password_hash FROM users WHERE email = ? COLLATE NOCASE",
                    USER_COLUMNS
                ),
                params![email.trim()],
                |row| {
                    Ok(UserCredentials {
                        user: user_from_row(row)?,
                        password_hash: row.get(9)?,
                    })
                },
            )
            .optional()?;
        Ok(credentials)
    }

    pub fn get_password_hash(&self, user_id: i64) -> Result<Option<String>> {
        let conn = self.conn()?;
        let hash = conn
            .query_row(
                "SELECT password_hash FROM users WHERE id = ?",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    /// Update name, email and avatar; the email must not belong to another user
    pub fn update_profile(
        &self,
        user_id: i64,
        name: &str,
        email: &str,
        avatar_link: Option<&str>,
    ) -> Result<User> {
        let conn = self.conn()?;

        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? COLLATE NOCASE AND id != ?)",
            params![email, user_id],
            |row| row.get(0),
        )?;
        if taken {
            return Err(Error::Conflict(format!("Email {} is already registered", email)));
        }

        let updated = conn.execute(
            "UPDATE users SET name = ?, email = ?, avatar_link = ? WHERE id = ?",
            params![name, email, avatar_link, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("User {}", user_id)));
        }
        drop(conn);

        self.get_user(user_id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", user_id)))
    }

    pub fn update_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE users SET password_hash = ? WHERE id = ?",
            params![password_hash, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("User {}", user_id)));
        }
        Ok(())
    }

    pub fn set_user_role(&self, user_id: i64, role: Role) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE users SET role = ? WHERE id = ?",
            params![role.as_str(), user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("User {}", user_id)));
        }
        Ok(())
    }

    /// Ban a user and revoke their sessions. Admins cannot be banned.
    pub fn ban_user(&self, user_id: i64, reason: &str) -> Result<User> {
        let user = self
            .get_user(user_id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", user_id)))?;
        if user.is_admin() {
            return Err(Error::Forbidden("Administrators cannot be banned".to_string()));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            UPDATE users
            SET is_banned = 1, ban_reason = ?, banned_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![reason, user_id],
        )?;
        tx.execute("DELETE FROM sessions WHERE user_id = ?", params![user_id])?;
        tx.commit()?;
        drop(conn);

        self.get_user(user_id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", user_id)))
    }

    pub fn unban_user(&self, user_id: i64) -> Result<User> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE users SET is_banned = 0, ban_reason = NULL, banned_at = NULL WHERE id = ?",
            params![user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("User {}", user_id)));
        }
        drop(conn);

        self.get_user(user_id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", user_id)))
    }

    /// List users for the admin panel: admins first, then newest
    pub fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let conn = self.conn()?;

        let mut conditions: Vec<&str> = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            conditions.push("(name LIKE ? OR email LIKE ?)");
            let pattern = format!("%{}%", query);
            params_vec.push(Box::new(pattern.clone()));
            params_vec.push(Box::new(pattern));
        }
        if let Some(role) = filter.role {
            conditions.push("role = ?");
            params_vec.push(Box::new(role.as_str()));
        }
        if let Some(banned) = filter.banned {
            conditions.push("is_banned = ?");
            params_vec.push(Box::new(banned));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            r#"
            SELECT {}
            FROM users
            {}
            ORDER BY CASE role WHEN 'admin' THEN 0 ELSE 1 END, created_at DESC, id DESC
            "#,
            USER_COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let users = stmt
            .query_map(params_refs.as_slice(), user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    pub fn count_users(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }
}
