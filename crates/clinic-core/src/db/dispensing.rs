//! Dispensing and stock-adjustment ledger operations.
//!
//! Ledger tables are append-only: there are insert and read operations,
//! nothing else.

use rust_decimal::Decimal;
use rusqlite::params;
use std::str::FromStr;

use super::{Database, DbResult};
use crate::models::{Dispensing, StockAdjustment};

impl Database {
    /// Append a dispensing ledger row. Returns the assigned row id.
    pub fn insert_dispensing(&self, row: &Dispensing) -> DbResult<i64> {
        self.conn().execute(
            r#"
            INSERT INTO dispensings (
                dispensing_number, prescription_id, prescription_item_id, drug_code,
                quantity, unit_price, stock_before, stock_after, pharmacist_id,
                notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                row.dispensing_number,
                row.prescription_id,
                row.prescription_item_id,
                row.drug_code,
                row.quantity,
                row.unit_price.to_string(),
                row.stock_before,
                row.stock_after,
                row.pharmacist_id,
                row.notes,
                row.created_at,
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// List ledger rows for a prescription in insertion order.
    pub fn list_dispensings_for_prescription(
        &self,
        prescription_id: &str,
    ) -> DbResult<Vec<Dispensing>> {
        let mut stmt = self.conn().prepare(
            r#"
            SELECT id, dispensing_number, prescription_id, prescription_item_id, drug_code,
                   quantity, unit_price, stock_before, stock_after, pharmacist_id,
                   notes, created_at
            FROM dispensings
            WHERE prescription_id = ?
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([prescription_id], |row| {
            Ok((
                Dispensing {
                    id: row.get(0)?,
                    dispensing_number: row.get(1)?,
                    prescription_id: row.get(2)?,
                    prescription_item_id: row.get(3)?,
                    drug_code: row.get(4)?,
                    quantity: row.get(5)?,
                    unit_price: Decimal::ZERO,
                    stock_before: row.get(7)?,
                    stock_after: row.get(8)?,
                    pharmacist_id: row.get(9)?,
                    notes: row.get(10)?,
                    created_at: row.get(11)?,
                },
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut dispensings = Vec::new();
        for row in rows {
            let (mut dispensing, unit_price) = row?;
            dispensing.unit_price = Decimal::from_str(&unit_price)?;
            dispensings.push(dispensing);
        }
        Ok(dispensings)
    }

    /// Append a stock-adjustment ledger row. Returns the assigned row id.
    pub fn insert_stock_adjustment(&self, row: &StockAdjustment) -> DbResult<i64> {
        self.conn().execute(
            r#"
            INSERT INTO stock_adjustments (
                drug_code, delta, stock_before, stock_after, staff_id, reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                row.drug_code,
                row.delta,
                row.stock_before,
                row.stock_after,
                row.staff_id,
                row.reason,
                row.created_at,
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// List stock adjustments for a drug, most recent first.
    pub fn list_stock_adjustments_for_drug(&self, drug_code: &str) -> DbResult<Vec<StockAdjustment>> {
        let mut stmt = self.conn().prepare(
            r#"
            SELECT id, drug_code, delta, stock_before, stock_after, staff_id, reason, created_at
            FROM stock_adjustments
            WHERE drug_code = ?
            ORDER BY id DESC
            "#,
        )?;
        let rows = stmt.query_map([drug_code], |row| {
            Ok(StockAdjustment {
                id: row.get(0)?,
                drug_code: row.get(1)?,
                delta: row.get(2)?,
                stock_before: row.get(3)?,
                stock_after: row.get(4)?,
                staff_id: row.get(5)?,
                reason: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;

        let mut adjustments = Vec::new();
        for row in rows {
            adjustments.push(row?);
        }
        Ok(adjustments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Drug, Patient, Prescription, Staff, StaffRole};

    fn setup_db() -> (Database, String, String) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("CLN-2024-00001".into(), "Jane".into(), "Doe".into());
        db.insert_patient(&patient).unwrap();
        let pharmacist = Staff::new("EMP-0001".into(), "Amina Okafor".into(), StaffRole::Pharmacist);
        db.insert_staff(&pharmacist).unwrap();

        let mut drug = Drug::new("PARA-500".into(), "Panadol 500mg".into());
        drug.quantity_in_stock = 10;
        db.upsert_drug(&drug).unwrap();

        let prescription = Prescription::new(
            "RX-20240115-0001".into(),
            patient.patient_id.clone(),
            pharmacist.staff_id.clone(),
        );
        db.insert_prescription(&prescription, &[]).unwrap();

        (db, prescription.prescription_id, pharmacist.staff_id)
    }

    #[test]
    fn test_insert_and_list_dispensings() {
        let (db, prescription_id, pharmacist_id) = setup_db();
        let row = Dispensing {
            id: 0,
            dispensing_number: "DSP-20240115-0001".into(),
            prescription_id: prescription_id.clone(),
            prescription_item_id: None,
            drug_code: "PARA-500".into(),
            quantity: 5,
            unit_price: Decimal::from_str("1.50").unwrap(),
            stock_before: 10,
            stock_after: 5,
            pharmacist_id,
            notes: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let id = db.insert_dispensing(&row).unwrap();
        assert!(id > 0);

        let rows = db.list_dispensings_for_prescription(&prescription_id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].stock_before, 10);
        assert_eq!(rows[0].stock_after, 5);
        assert_eq!(rows[0].unit_price, Decimal::from_str("1.50").unwrap());
    }

    #[test]
    fn test_ledger_rejects_negative_stock_after(){
        let (db, prescription_id, pharmacist_id) = setup_db();
        let row = Dispensing {
            id: 0,
            dispensing_number: "DSP-20240115-0001".into(),
            prescription_id,
            prescription_item_id: None,
            drug_code: "PARA-500".into(),
            quantity: 11,
            unit_price: Decimal::ZERO,
            stock_before: 10,
            stock_after: -1,
            pharmacist_id,
            notes: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        assert!(db.insert_dispensing(&row).is_err());
    }

    #[test]
    fn test_stock_adjustment_round_trip() {
        let (db, _, staff_id) = setup_db();
        let row = StockAdjustment {
            id: 0,
            drug_code: "PARA-500".into(),
            delta: 90,
            stock_before: 10,
            stock_after: 100,
            staff_id,
            reason: Some("delivery".into()),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        db.insert_stock_adjustment(&row).unwrap();

        let rows = db.list_stock_adjustments_for_drug("PARA-500").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].delta, 90);
        assert_eq!(rows[0].reason.as_deref(), Some("delivery"));
    }
}
