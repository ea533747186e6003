//! Catalog entries and moderation
//!
//! Moderation writes and the notifications they trigger share one
//! transaction, so a creator is never told about a change that rolled back.

use std::collections::BTreeSet;

use rusqlite::{params, OptionalExtension, Row};

use super::notifications::insert_notification;
use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    BillingPeriod, CatalogEntry, CatalogFilter, CatalogStatus, Category, NewCatalogEntry,
    NotificationKind,
};

/// Subscriber counts exclude banned users
const CATALOG_SELECT: &str = r#"
    SELECT c.id, c.name, c.icon, c.category, c.price, c.period, c.status,
           c.created_by, c.moderated_by, c.moderated_at, c.moderation_comment,
           (SELECT COUNT(*)
              FROM user_subscriptions us
              JOIN users u ON u.id = us.user_id
             WHERE us.catalog_id = c.id AND u.is_banned = 0) AS subscribers_count,
           c.created_at, c.updated_at
    FROM catalog_entries c
"#;

fn catalog_entry_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
    let category_str: String = row.get(3)?;
    let period_months: i64 = row.get(5)?;
    let status_str: String = row.get(6)?;
    let moderated_at_str: Option<String> = row.get(9)?;
    let created_at_str: String = row.get(12)?;
    let updated_at_str: String = row.get(13)?;

    Ok(CatalogEntry {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
        category: Category::from_slug_or_default(&category_str),
        price: row.get(4)?,
        period: BillingPeriod::try_from(period_months).unwrap_or_default(),
        status: status_str.parse().unwrap_or(CatalogStatus::Pending),
        created_by: row.get(7)?,
        moderated_by: row.get(8)?,
        moderated_at: moderated_at_str.map(|s| parse_datetime(&s)),
        moderation_comment: row.get(10)?,
        subscribers_count: row.get(11)?,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

/// What removing a catalog entry did
#[derive(Debug, Clone)]
pub enum RemovalOutcome {
    /// A pending submission was rejected and kept for its creator
    Rejected(CatalogEntry),
    /// The entry and every subscription referencing it were deleted
    Deleted {
        entry: CatalogEntry,
        notified_users: usize,
    },
}

impl Database {
    pub fn create_catalog_entry(
        &self,
        entry: &NewCatalogEntry,
        created_by: Option<i64>,
        status: CatalogStatus,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO catalog_entries (name, icon, category, price, period, status, created_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                entry.name,
                entry.icon,
                entry.category.as_str(),
                entry.price,
                entry.period.months(),
                status.as_str(),
                created_by,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_catalog_entry(&self, id: i64) -> Result<Option<CatalogEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                &format!("{} WHERE c.id = ?", CATALOG_SELECT),
                params![id],
                catalog_entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Every published entry, unordered (see `CatalogSnapshot` for ranking)
    pub fn list_published_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE c.status = 'published'", CATALOG_SELECT))?;
        let entries = stmt
            .query_map([], catalog_entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Entries a user submitted, newest first
    pub fn list_catalog_submissions(&self, user_id: i64) -> Result<Vec<CatalogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE c.created_by = ? ORDER BY c.created_at DESC, c.id DESC",
            CATALOG_SELECT
        ))?;
        let entries = stmt
            .query_map(params![user_id], catalog_entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Admin listing: the pending queue is oldest first, everything else is
    /// most recently updated first.
    pub fn list_catalog(&self, filter: &CatalogFilter) -> Result<Vec<CatalogEntry>> {
        let conn = self.conn()?;

        let mut conditions = vec!["c.status = ?"];
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(filter.status.as_str())];

        if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            conditions.push("c.name LIKE ?");
            params_vec.push(Box::new(format!("%{}%", query)));
        }
        if let Some(category) = filter.category {
            conditions.push("c.category = ?");
            params_vec.push(Box::new(category.as_str()));
        }
        if let Some(period) = filter.period {
            conditions.push("c.period = ?");
            params_vec.push(Box::new(period.months()));
        }

        let order = match filter.status {
            CatalogStatus::Pending => "c.created_at ASC, c.id ASC",
            _ => "c.updated_at DESC, c.id DESC",
        };

        let query = format!(
            "{} WHERE {} ORDER BY {}",
            CATALOG_SELECT,
            conditions.join(" AND "),
            order
        );

        let mut stmt = conn.prepare(&query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let entries = stmt
            .query_map(params_refs.as_slice(), catalog_entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Admin edit of a catalog entry
    pub fn update_catalog_entry(
        &self,
        id: i64,
        entry: &NewCatalogEntry,
        moderator_id: i64,
        comment: Option<&str>,
    ) -> Result<CatalogEntry> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE catalog_entries
            SET name = ?, icon = ?, category = ?, price = ?, period = ?,
                moderated_by = ?, moderated_at = CURRENT_TIMESTAMP,
                moderation_comment = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                entry.name,
                entry.icon,
                entry.category.as_str(),
                entry.price,
                entry.period.months(),
                moderator_id,
                comment,
                id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Catalog entry {}", id)));
        }
        drop(conn);

        self.get_catalog_entry(id)?
            .ok_or_else(|| Error::NotFound(format!("Catalog entry {}", id)))
    }

    /// Publish an entry and notify its creator
    pub fn publish_catalog_entry(
        &self,
        id: i64,
        moderator_id: i64,
        comment: Option<&str>,
    ) -> Result<CatalogEntry> {
        let entry = self
            .get_catalog_entry(id)?
            .ok_or_else(|| Error::NotFound(format!("Catalog entry {}", id)))?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            UPDATE catalog_entries
            SET status = 'published', moderated_by = ?, moderated_at = CURRENT_TIMESTAMP,
                moderation_comment = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![moderator_id, comment, id],
        )?;
        if let Some(creator) = entry.created_by {
            insert_notification(
                &tx,
                creator,
                NotificationKind::Success,
                "Subscription published",
                &format!(
                    "Your submission \"{}\" passed moderation and is now published.",
                    entry.name
                ),
            )?;
        }
        tx.commit()?;
        drop(conn);

        self.get_catalog_entry(id)?
            .ok_or_else(|| Error::NotFound(format!("Catalog entry {}", id)))
    }

    /// Remove an entry with a reason.
    ///
    /// A pending entry is rejected and its creator told why. Anything else is
    /// deleted along with user subscriptions referencing it; if it was
    /// published, each affected user is notified once.
    pub fn remove_catalog_entry(
        &self,
        id: i64,
        moderator_id: i64,
        reason: &str,
    ) -> Result<RemovalOutcome> {
        let entry = self
            .get_catalog_entry(id)?
            .ok_or_else(|| Error::NotFound(format!("Catalog entry {}", id)))?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if entry.status == CatalogStatus::Pending {
            tx.execute(
                r#"
                UPDATE catalog_entries
                SET status = 'rejected', moderated_by = ?, moderated_at = CURRENT_TIMESTAMP,
                    moderation_comment = ?, updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
                params![moderator_id, reason, id],
            )?;
            if let Some(creator) = entry.created_by {
                insert_notification(
                    &tx,
                    creator,
                    NotificationKind::Warning,
                    "Submission rejected",
                    &format!(
                        "Subscription \"{}\" was rejected by a moderator. Reason: {}.",
                        entry.name, reason
                    ),
                )?;
            }
            tx.commit()?;
            drop(conn);

            let rejected = self
                .get_catalog_entry(id)?
                .ok_or_else(|| Error::NotFound(format!("Catalog entry {}", id)))?;
            return Ok(RemovalOutcome::Rejected(rejected));
        }

        let affected: BTreeSet<i64> = {
            let mut stmt =
                tx.prepare("SELECT DISTINCT user_id FROM user_subscriptions WHERE catalog_id = ?")?;
            let ids = stmt
                .query_map(params![id], |row| row.get(0))?
                .collect::<std::result::Result<BTreeSet<i64>, _>>()?;
            ids
        };

        tx.execute("DELETE FROM user_subscriptions WHERE catalog_id = ?", params![id])?;
        tx.execute("DELETE FROM catalog_entries WHERE id = ?", params![id])?;

        let mut notified_users = 0;
        if entry.status == CatalogStatus::Published {
            let message = format!(
                "Subscription \"{}\" was unpublished by an administrator. Reason: {}.",
                entry.name, reason
            );
            for user_id in &affected {
                insert_notification(
                    &tx,
                    *user_id,
                    NotificationKind::Warning,
                    "Subscription removed",
                    &message,
                )?;
            }
            notified_users = affected.len();
        }
        tx.commit()?;

        Ok(RemovalOutcome::Deleted {
            entry,
            notified_users,
        })
    }
}
