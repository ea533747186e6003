//! User subscription operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_date, parse_datetime, Database, DbConn};
use crate::analytics::monthly_amount;
use crate::error::{Error, Result};
use crate::models::{BillingPeriod, Category, NewSubscription, Subscription};

const SUBSCRIPTION_COLUMNS: &str = r#"
    id, user_id, catalog_id, name, icon, category, price, period,
    next_payment_at, payment_method_id, payment_method_label, created_at
"#;

fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    let category_str: String = row.get(5)?;
    let price: f64 = row.get(6)?;
    let period_months: i64 = row.get(7)?;
    let next_payment_str: Option<String> = row.get(8)?;
    let created_at_str: String = row.get(11)?;

    Ok(Subscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        catalog_id: row.get(2)?,
        name: row.get(3)?,
        icon: row.get(4)?,
        category: Category::from_slug_or_default(&category_str),
        price,
        monthly_price: monthly_amount(price, period_months),
        period: BillingPeriod::try_from(period_months).unwrap_or_default(),
        next_payment_at: parse_date(next_payment_str),
        payment_method_id: row.get(9)?,
        payment_method_label: row.get(10)?,
        created_at: parse_datetime(&created_at_str),
    })
}

/// Case-insensitive name clash among a user's subscriptions
fn name_taken(conn: &DbConn, user_id: i64, name: &str, exclude_id: Option<i64>) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT id, name FROM user_subscriptions WHERE user_id = ?")?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let wanted = name.trim().to_lowercase();
    Ok(rows
        .iter()
        .any(|(id, existing)| Some(*id) != exclude_id && existing.trim().to_lowercase() == wanted))
}

impl Database {
    /// A user's subscriptions, soonest payment first, undated last
    pub fn list_user_subscriptions(&self, user_id: i64) -> Result<Vec<Subscription>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM user_subscriptions
            WHERE user_id = ?
            ORDER BY next_payment_at ASC NULLS LAST, id ASC
            "#,
            SUBSCRIPTION_COLUMNS
        ))?;

        let subscriptions = stmt
            .query_map(params![user_id], subscription_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(subscriptions)
    }

    pub fn get_user_subscription(&self, user_id: i64, id: i64) -> Result<Option<Subscription>> {
        let conn = self.conn()?;
        let subscription = conn
            .query_row(
                &format!(
                    "SELECT {} FROM user_subscriptions WHERE id = ? AND user_id = ?",
                    SUBSCRIPTION_COLUMNS
                ),
                params![id, user_id],
                subscription_from_row,
            )
            .optional()?;
        Ok(subscription)
    }

    /// Attach a subscription to a user. Names are unique per user, ignoring case.
    pub fn create_user_subscription(&self, user_id: i64, sub: &NewSubscription) -> Result<i64> {
        let conn = self.conn()?;

        if name_taken(&conn, user_id, &sub.name, None)? {
            return Err(Error::Conflict(format!(
                "Subscription {} already exists",
                sub.name
            )));
        }

        conn.execute(
            r#"
            INSERT INTO user_subscriptions
                (user_id, catalog_id, name, icon, category, price, period,
                 next_payment_at, payment_method_id, payment_method_label)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                sub.catalog_id,
                sub.name,
                sub.icon,
                sub.category.as_str(),
                sub.price,
                sub.period.months(),
                sub.next_payment_at.map(|d| d.to_string()),
                sub.payment_method_id,
                sub.payment_method_label,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn update_user_subscription(
        &self,
        user_id: i64,
        id: i64,
        sub: &NewSubscription,
    ) -> Result<Subscription> {
        let conn = self.conn()?;

        if name_taken(&conn, user_id, &sub.name, Some(id))? {
            return Err(Error::Conflict(format!(
                "Subscription {} already exists",
                sub.name
            )));
        }

        let updated = conn.execute(
            r#"
            UPDATE user_subscriptions
            SET name = ?, icon = ?, category = ?, price = ?, period = ?,
                next_payment_at = ?, payment_method_id = ?, payment_method_label = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                sub.name,
                sub.icon,
                sub.category.as_str(),
                sub.price,
                sub.period.months(),
                sub.next_payment_at.map(|d| d.to_string()),
                sub.payment_method_id,
                sub.payment_method_label,
                id,
                user_id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Subscription {}", id)));
        }
        drop(conn);

        self.get_user_subscription(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Subscription {}", id)))
    }

    pub fn delete_user_subscription(&self, user_id: i64, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM user_subscriptions WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }
}
