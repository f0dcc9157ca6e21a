//! Prescription database operations.

use rust_decimal::Decimal;
use rusqlite::{params, OptionalExtension};
use std::str::FromStr;

use super::{Database, DbError, DbResult};
use crate::models::{Prescription, PrescriptionItem, PrescriptionStatus};

/// Intermediate row struct for database mapping.
struct PrescriptionRow {
    prescription_id: String,
    prescription_number: String,
    patient_id: String,
    visit_id: Option<String>,
    doctor_id: String,
    notes: Option<String>,
    status: String,
    sent_to_pharmacy_at: Option<String>,
    dispensed_at: Option<String>,
    dispensed_by: Option<String>,
    deleted: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PrescriptionRow> for Prescription {
    type Error = DbError;

    fn try_from(row: PrescriptionRow) -> Result<Self, Self::Error> {
        let status = PrescriptionStatus::parse(&row.status).ok_or_else(|| {
            DbError::Constraint(format!("Unknown prescription status: {}", row.status))
        })?;
        Ok(Prescription {
            prescription_id: row.prescription_id,
            prescription_number: row.prescription_number,
            patient_id: row.patient_id,
            visit_id: row.visit_id,
            doctor_id: row.doctor_id,
            notes: row.notes,
            status,
            sent_to_pharmacy_at: row.sent_to_pharmacy_at,
            dispensed_at: row.dispensed_at,
            dispensed_by: row.dispensed_by,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PRESCRIPTION_SELECT: &str = r#"
    SELECT prescription_id, prescription_number, patient_id, visit_id, doctor_id,
           notes, status, sent_to_pharmacy_at, dispensed_at, dispensed_by,
           deleted, created_at, updated_at
    FROM prescriptions
"#;

fn prescription_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrescriptionRow> {
    Ok(PrescriptionRow {
        prescription_id: row.get(0)?,
        prescription_number: row.get(1)?,
        patient_id: row.get(2)?,
        visit_id: row.get(3)?,
        doctor_id: row.get(4)?,
        notes: row.get(5)?,
        status: row.get(6)?,
        sent_to_pharmacy_at: row.get(7)?,
        dispensed_at: row.get(8)?,
        dispensed_by: row.get(9)?,
        deleted: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(PrescriptionItem, String)> {
    // unit_price comes back as TEXT; parsed by the caller so Decimal errors
    // surface as DbError rather than rusqlite::Error
    Ok((
        PrescriptionItem {
            id: row.get(0)?,
            prescription_id: row.get(1)?,
            drug_code: row.get(2)?,
            quantity: row.get(3)?,
            quantity_dispensed: row.get(4)?,
            unit_price: Decimal::ZERO,
            dosage: row.get(6)?,
        },
        row.get::<_, String>(5)?,
    ))
}

fn parse_item((mut item, unit_price): (PrescriptionItem, String)) -> DbResult<PrescriptionItem> {
    item.unit_price = Decimal::from_str(&unit_price)?;
    Ok(item)
}

impl Database {
    /// Insert a prescription together with its items. Items are returned
    /// with their assigned row ids.
    pub fn insert_prescription(
        &self,
        prescription: &Prescription,
        items: &[PrescriptionItem],
    ) -> DbResult<Vec<PrescriptionItem>> {
        self.conn().execute(
            r#"
            INSERT INTO prescriptions (
                prescription_id, prescription_number, patient_id, visit_id, doctor_id,
                notes, status, sent_to_pharmacy_at, dispensed_at, dispensed_by,
                deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                prescription.prescription_id,
                prescription.prescription_number,
                prescription.patient_id,
                prescription.visit_id,
                prescription.doctor_id,
                prescription.notes,
                prescription.status.as_str(),
                prescription.sent_to_pharmacy_at,
                prescription.dispensed_at,
                prescription.dispensed_by,
                prescription.deleted,
                prescription.created_at,
                prescription.updated_at,
            ],
        )?;

        let mut saved = Vec::with_capacity(items.len());
        for item in items {
            self.conn().execute(
                r#"
                INSERT INTO prescription_items (
                    prescription_id, drug_code, quantity, quantity_dispensed, unit_price, dosage
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    prescription.prescription_id,
                    item.drug_code,
                    item.quantity,
                    item.quantity_dispensed,
                    item.unit_price.to_string(),
                    item.dosage,
                ],
            )?;
            saved.push(PrescriptionItem {
                id: self.conn().last_insert_rowid(),
                prescription_id: prescription.prescription_id.clone(),
                ..item.clone()
            });
        }
        Ok(saved)
    }

    /// Get a prescription by id. Tombstoned rows are invisible here.
    pub fn get_prescription(&self, prescription_id: &str) -> DbResult<Option<Prescription>> {
        let sql = format!("{PRESCRIPTION_SELECT} WHERE prescription_id = ? AND deleted = 0");
        self.conn()
            .query_row(&sql, [prescription_id], prescription_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a prescription by id, tombstones included. Audit/export paths only.
    pub fn get_prescription_including_deleted(
        &self,
        prescription_id: &str,
    ) -> DbResult<Option<Prescription>> {
        let sql = format!("{PRESCRIPTION_SELECT} WHERE prescription_id = ?");
        self.conn()
            .query_row(&sql, [prescription_id], prescription_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a prescription by its human-readable number.
    pub fn find_prescription_by_number(&self, number: &str) -> DbResult<Option<Prescription>> {
        let sql = format!("{PRESCRIPTION_SELECT} WHERE prescription_number = ? AND deleted = 0");
        self.conn()
            .query_row(&sql, [number], prescription_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List live prescriptions for a patient, most recent first.
    pub fn list_prescriptions_for_patient(&self, patient_id: &str) -> DbResult<Vec<Prescription>> {
        let sql = format!(
            "{PRESCRIPTION_SELECT} WHERE patient_id = ? AND deleted = 0 ORDER BY created_at DESC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([patient_id], prescription_row)?;

        let mut prescriptions = Vec::new();
        for row in rows {
            prescriptions.push(row?.try_into()?);
        }
        Ok(prescriptions)
    }

    /// List the items of a prescription in insertion order.
    pub fn get_prescription_items(&self, prescription_id: &str) -> DbResult<Vec<PrescriptionItem>> {
        let mut stmt = self.conn().prepare(
            r#"
            SELECT id, prescription_id, drug_code, quantity, quantity_dispensed, unit_price, dosage
            FROM prescription_items
            WHERE prescription_id = ?
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([prescription_id], item_from_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(parse_item(row?)?);
        }
        Ok(items)
    }

    /// Get a single prescription item by row id.
    pub fn get_prescription_item(&self, item_id: i64) -> DbResult<Option<PrescriptionItem>> {
        self.conn()
            .query_row(
                r#"
                SELECT id, prescription_id, drug_code, quantity, quantity_dispensed, unit_price, dosage
                FROM prescription_items
                WHERE id = ?
                "#,
                [item_id],
                item_from_row,
            )
            .optional()?
            .map(parse_item)
            .transpose()
    }

    /// Record the dispensed quantity on an item.
    pub fn set_item_quantity_dispensed(&self, item_id: i64, quantity: i64) -> DbResult<bool> {
        let rows_affected = self.conn().execute(
            "UPDATE prescription_items SET quantity_dispensed = ?2 WHERE id = ?1",
            params![item_id, quantity],
        )?;
        Ok(rows_affected > 0)
    }

    /// Update a prescription's status, stamping the pharmacy hand-off time
    /// when it moves to SentToPharmacy.
    pub fn update_prescription_status(
        &self,
        prescription_id: &str,
        status: PrescriptionStatus,
    ) -> DbResult<bool> {
        let rows_affected = if status == PrescriptionStatus::SentToPharmacy {
            self.conn().execute(
                r#"
                UPDATE prescriptions SET
                    status = ?2,
                    sent_to_pharmacy_at = ?3,
                    updated_at = datetime('now')
                WHERE prescription_id = ?1 AND deleted = 0
                "#,
                params![
                    prescription_id,
                    status.as_str(),
                    chrono::Utc::now().to_rfc3339(),
                ],
            )?
        } else {
            self.conn().execute(
                r#"
                UPDATE prescriptions SET
                    status = ?2,
                    updated_at = datetime('now')
                WHERE prescription_id = ?1 AND deleted = 0
                "#,
                params![prescription_id, status.as_str()],
            )?
        };
        Ok(rows_affected > 0)
    }

    /// Flip a prescription to Dispensed, stamping the time and pharmacist.
    pub fn mark_prescription_dispensed(
        &self,
        prescription_id: &str,
        pharmacist_id: &str,
    ) -> DbResult<bool> {
        let rows_affected = self.conn().execute(
            r#"
            UPDATE prescriptions SET
                status = 'dispensed',
                dispensed_at = ?2,
                dispensed_by = ?3,
                updated_at = datetime('now')
            WHERE prescription_id = ?1 AND deleted = 0
            "#,
            params![
                prescription_id,
                chrono::Utc::now().to_rfc3339(),
                pharmacist_id,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Soft-delete a prescription.
    pub fn soft_delete_prescription(&self, prescription_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn().execute(
            "UPDATE prescriptions SET deleted = 1, updated_at = datetime('now') WHERE prescription_id = ? AND deleted = 0",
            [prescription_id],
        )?;
        Ok(rows_affected > 0)
    }
}
