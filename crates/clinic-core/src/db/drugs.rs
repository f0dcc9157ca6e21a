//! Drug catalog database operations.

use rust_decimal::Decimal;
use rusqlite::{params, OptionalExtension};
use std::str::FromStr;

use super::{Database, DbError, DbResult};
use crate::models::Drug;

/// Intermediate row struct for database mapping.
struct DrugRow {
    code: String,
    name: String,
    generic_name: Option<String>,
    category: Option<String>,
    unit: String,
    unit_price: String,
    quantity_in_stock: i64,
    reorder_level: i64,
    deleted: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<DrugRow> for Drug {
    type Error = DbError;

    fn try_from(row: DrugRow) -> Result<Self, Self::Error> {
        Ok(Drug {
            code: row.code,
            name: row.name,
            generic_name: row.generic_name,
            category: row.category,
            unit: row.unit,
            unit_price: Decimal::from_str(&row.unit_price)?,
            quantity_in_stock: row.quantity_in_stock,
            reorder_level: row.reorder_level,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn drug_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DrugRow> {
    Ok(DrugRow {
        code: row.get(0)?,
        name: row.get(1)?,
        generic_name: row.get(2)?,
        category: row.get(3)?,
        unit: row.get(4)?,
        unit_price: row.get(5)?,
        quantity_in_stock: row.get(6)?,
        reorder_level: row.get(7)?,
        deleted: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const DRUG_COLUMNS: &str = "code, name, generic_name, category, unit, unit_price, \
                            quantity_in_stock, reorder_level, deleted, created_at, updated_at";

impl Database {
    /// Insert or update a drug.
    pub fn upsert_drug(&self, drug: &Drug) -> DbResult<()> {
        self.conn().execute(
            r#"
            INSERT INTO drugs (
                code, name, generic_name, category, unit, unit_price,
                quantity_in_stock, reorder_level, deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, datetime('now'))
            ON CONFLICT(code) DO UPDATE SET
                name = excluded.name,
                generic_name = excluded.generic_name,
                category = excluded.category,
                unit = excluded.unit,
                unit_price = excluded.unit_price,
                quantity_in_stock = excluded.quantity_in_stock,
                reorder_level = excluded.reorder_level,
                deleted = excluded.deleted,
                updated_at = datetime('now')
            "#,
            params![
                drug.code,
                drug.name,
                drug.generic_name,
                drug.category,
                drug.unit,
                drug.unit_price.to_string(),
                drug.quantity_in_stock,
                drug.reorder_level,
                drug.deleted,
                drug.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a drug by code. Tombstoned rows are invisible here.
    pub fn get_drug(&self, code: &str) -> DbResult<Option<Drug>> {
        let sql = format!("SELECT {DRUG_COLUMNS} FROM drugs WHERE code = ? AND deleted = 0");
        self.conn()
            .query_row(&sql, [code], drug_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Search drugs by code/name/generic name using FTS5 (BM25 ranking).
    pub fn search_drugs(&self, query: &str, limit: usize) -> DbResult<Vec<Drug>> {
        // Escape special FTS5 characters and add prefix matching
        let escaped_query = escape_fts_query(query);
        if escaped_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn().prepare(
            r#"
            SELECT d.code, d.name, d.generic_name, d.category, d.unit, d.unit_price,
                   d.quantity_in_stock, d.reorder_level, d.deleted, d.created_at, d.updated_at,
                   bm25(drugs_fts) as rank
            FROM drugs d
            JOIN drugs_fts fts ON d.rowid = fts.rowid
            WHERE drugs_fts MATCH ?
            AND d.deleted = 0
            ORDER BY rank
            LIMIT ?
            "#,
        )?;
        let rows = stmt.query_map(params![escaped_query, limit as i64], drug_row)?;

        let mut drugs = Vec::new();
        for row in rows {
            drugs.push(row?.try_into()?);
        }
        Ok(drugs)
    }

    /// List all live drugs.
    pub fn list_drugs(&self) -> DbResult<Vec<Drug>> {
        let sql = format!("SELECT {DRUG_COLUMNS} FROM drugs WHERE deleted = 0 ORDER BY name");
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], drug_row)?;

        let mut drugs = Vec::new();
        for row in rows {
            drugs.push(row?.try_into()?);
        }
        Ok(drugs)
    }

    /// List live drugs at or below their reorder level.
    pub fn list_low_stock_drugs(&self) -> DbResult<Vec<Drug>> {
        let sql = format!(
            r#"
            SELECT {DRUG_COLUMNS} FROM drugs
            WHERE deleted = 0 AND quantity_in_stock <= reorder_level
            ORDER BY quantity_in_stock - reorder_level
            "#
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], drug_row)?;

        let mut drugs = Vec::new();
        for row in rows {
            drugs.push(row?.try_into()?);
        }
        Ok(drugs)
    }

    /// Set a drug's stock level directly. Callers are responsible for the
    /// accompanying ledger row; the CHECK constraint rejects negatives.
    pub fn set_drug_stock(&self, code: &str, quantity_in_stock: i64) -> DbResult<bool> {
        let rows_affected = self.conn().execute(
            "UPDATE drugs SET quantity_in_stock = ?2, updated_at = datetime('now') WHERE code = ?1 AND deleted = 0",
            params![code, quantity_in_stock],
        )?;
        Ok(rows_affected > 0)
    }

    /// Soft-delete a drug.
    pub fn soft_delete_drug(&self, code: &str) -> DbResult<bool> {
        let rows_affected = self.conn().execute(
            "UPDATE drugs SET deleted = 1, updated_at = datetime('now') WHERE code = ? AND deleted = 0",
            [code],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Escape special FTS5 characters and prepare query for prefix matching.
fn escape_fts_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .map(|word| format!("{}*", word))
        .collect::<Vec<_>>()
        .join(" ")
}
