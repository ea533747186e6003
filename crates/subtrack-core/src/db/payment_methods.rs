//! Payment method operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database, DbConn};
use crate::error::{Error, Result};
use crate::models::{payment_method_label, PaymentMethod};

const PAYMENT_METHOD_SELECT: &str = r#"
    SELECT pm.id, pm.user_id, pm.bank_id, b.name, b.icon_link, pm.card_number, pm.is_default,
           (SELECT COUNT(*) FROM user_subscriptions us WHERE us.payment_method_id = pm.id),
           pm.created_at
    FROM payment_methods pm
    JOIN banks b ON b.id = pm.bank_id
"#;

fn payment_method_from_row(row: &Row<'_>) -> rusqlite::Result<PaymentMethod> {
    let created_at_str: String = row.get(8)?;
    Ok(PaymentMethod {
        id: row.get(0)?,
        user_id: row.get(1)?,
        bank_id: row.get(2)?,
        bank_name: row.get(3)?,
        bank_icon: row.get(4)?,
        card_number: row.get(5)?,
        is_default: row.get(6)?,
        subscriptions_count: row.get(7)?,
        created_at: parse_datetime(&created_at_str),
    })
}

fn bank_name(conn: &DbConn, bank_id: i64) -> Result<String> {
    conn.query_row(
        "SELECT name FROM banks WHERE id = ?",
        params![bank_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("Bank {}", bank_id)))
}

/// Case-insensitive card clash among a user's methods
fn card_taken(conn: &DbConn, user_id: i64, card_number: &str, exclude_id: Option<i64>) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT id, card_number FROM payment_methods WHERE user_id = ?")?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let wanted = card_number.to_lowercase();
    Ok(rows
        .iter()
        .any(|(id, existing)| Some(*id) != exclude_id && existing.to_lowercase() == wanted))
}

impl Database {
    /// A user's methods, default first, then oldest first
    pub fn list_payment_methods(&self, user_id: i64) -> Result<Vec<PaymentMethod>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE pm.user_id = ? ORDER BY pm.is_default DESC, pm.created_at ASC, pm.id ASC",
            PAYMENT_METHOD_SELECT
        ))?;
        let methods = stmt
            .query_map(params![user_id], payment_method_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(methods)
    }

    pub fn get_payment_method(&self, user_id: i64, id: i64) -> Result<Option<PaymentMethod>> {
        let conn = self.conn()?;
        let method = conn
            .query_row(
                &format!("{} WHERE pm.id = ? AND pm.user_id = ?", PAYMENT_METHOD_SELECT),
                params![id, user_id],
                payment_method_from_row,
            )
            .optional()?;
        Ok(method)
    }

    fn require_payment_method(&self, user_id: i64, id: i64) -> Result<PaymentMethod> {
        self.get_payment_method(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Payment method {}", id)))
    }

    /// Add a card. The user's first card becomes the default.
    pub fn create_payment_method(
        &self,
        user_id: i64,
        bank_id: i64,
        card_number: &str,
    ) -> Result<PaymentMethod> {
        let conn = self.conn()?;

        bank_name(&conn, bank_id)?;
        if card_taken(&conn, user_id, card_number, None)? {
            return Err(Error::Conflict(format!("Card {} is already added", card_number)));
        }

        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM payment_methods WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;

        conn.execute(
            "INSERT INTO payment_methods (user_id, bank_id, card_number, is_default) VALUES (?, ?, ?, ?)",
            params![user_id, bank_id, card_number, existing == 0],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.require_payment_method(user_id, id)
    }

    /// Change bank or card number and relabel every subscription charged to it
    pub fn update_payment_method(
        &self,
        user_id: i64,
        id: i64,
        bank_id: i64,
        card_number: &str,
    ) -> Result<PaymentMethod> {
        self.require_payment_method(user_id, id)?;

        let mut conn = self.conn()?;
        let bank = bank_name(&conn, bank_id)?;
        if card_taken(&conn, user_id, card_number, Some(id))? {
            return Err(Error::Conflict(format!("Card {} is already added", card_number)));
        }

        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE payment_methods SET bank_id = ?, card_number = ? WHERE id = ? AND user_id = ?",
            params![bank_id, card_number, id, user_id],
        )?;
        tx.execute(
            "UPDATE user_subscriptions SET payment_method_label = ? WHERE payment_method_id = ? AND user_id = ?",
            params![payment_method_label(&bank, card_number), id, user_id],
        )?;
        tx.commit()?;
        drop(conn);

        self.require_payment_method(user_id, id)
    }

    pub fn set_default_payment_method(&self, user_id: i64, id: i64) -> Result<PaymentMethod> {
        self.require_payment_method(user_id, id)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE payment_methods SET is_default = (id = ?) WHERE user_id = ?",
            params![id, user_id],
        )?;
        tx.commit()?;
        drop(conn);

        self.require_payment_method(user_id, id)
    }

    /// Delete an unused card. Removing the default promotes the oldest
    /// remaining card.
    pub fn delete_payment_method(&self, user_id: i64, id: i64) -> Result<()> {
        let method = self.require_payment_method(user_id, id)?;
        if method.subscriptions_count > 0 {
            return Err(Error::Conflict(format!(
                "Payment method is used by {} subscription(s)",
                method.subscriptions_count
            )));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM payment_methods WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if method.is_default {
            tx.execute(
                r#"
                UPDATE payment_methods SET is_default = 1
                WHERE id = (
                    SELECT id FROM payment_methods
                    WHERE user_id = ?
                    ORDER BY created_at ASC, id ASC
                    LIMIT 1
                )
                "#,
                params![user_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
