//! Bank operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Bank;

fn bank_from_row(row: &Row<'_>) -> rusqlite::Result<Bank> {
    let created_at_str: String = row.get(3)?;
    Ok(Bank {
        id: row.get(0)?,
        name: row.get(1)?,
        icon_link: row.get(2)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    pub fn list_banks(&self) -> Result<Vec<Bank>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, icon_link, created_at FROM banks ORDER BY name COLLATE NOCASE, id",
        )?;
        let banks = stmt
            .query_map([], bank_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(banks)
    }

    pub fn get_bank(&self, id: i64) -> Result<Option<Bank>> {
        let conn = self.conn()?;
        let bank = conn
            .query_row(
                "SELECT id, name, icon_link, created_at FROM banks WHERE id = ?",
                params![id],
                bank_from_row,
            )
            .optional()?;
        Ok(bank)
    }

    pub fn create_bank(&self, name: &str, icon_link: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO banks (name, icon_link) VALUES (?, ?)",
            params![name, icon_link],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_bank(&self, id: i64, name: &str, icon_link: &str) -> Result<Bank> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE banks SET name = ?, icon_link = ? WHERE id = ?",
            params![name, icon_link, id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Bank {}", id)));
        }
        drop(conn);

        self.get_bank(id)?
            .ok_or_else(|| Error::NotFound(format!("Bank {}", id)))
    }

    /// Delete a bank no payment method uses
    pub fn delete_bank(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;

        let in_use: i64 = conn.query_row(
            "SELECT COUNT(*) FROM payment_methods WHERE bank_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if in_use > 0 {
            return Err(Error::Conflict(format!(
                "Bank is used by {} payment method(s)",
                in_use
            )));
        }

        let deleted = conn.execute("DELETE FROM banks WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Bank {}", id)));
        }
        Ok(())
    }
}
