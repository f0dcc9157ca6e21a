//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::Patient;

const PATIENT_COLUMNS: &str = "patient_id, clinic_number, first_name, last_name, date_of_birth, \
                               phone, address, notes, deleted, created_at, updated_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        patient_id: row.get(0)?,
        clinic_number: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        date_of_birth: row.get(4)?,
        phone: row.get(5)?,
        address: row.get(6)?,
        notes: row.get(7)?,
        deleted: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn().execute(
            r#"
            INSERT INTO patients (
                patient_id, clinic_number, first_name, last_name, date_of_birth,
                phone, address, notes, deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                patient.patient_id,
                patient.clinic_number,
                patient.first_name,
                patient.last_name,
                patient.date_of_birth,
                patient.phone,
                patient.address,
                patient.notes,
                patient.deleted,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing patient's demographic fields.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let rows_affected = self.conn().execute(
            r#"
            UPDATE patients SET
                first_name = ?2,
                last_name = ?3,
                date_of_birth = ?4,
                phone = ?5,
                address = ?6,
                notes = ?7,
                updated_at = datetime('now')
            WHERE patient_id = ?1 AND deleted = 0
            "#,
            params![
                patient.patient_id,
                patient.first_name,
                patient.last_name,
                patient.date_of_birth,
                patient.phone,
                patient.address,
                patient.notes,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by id. Tombstoned rows are invisible here.
    pub fn get_patient(&self, patient_id: &str) -> DbResult<Option<Patient>> {
        let sql = format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE patient_id = ? AND deleted = 0"
        );
        Ok(self
            .conn()
            .query_row(&sql, [patient_id], patient_from_row)
            .optional()?)
    }

    /// Get a patient by clinic number. Tombstoned rows are invisible here.
    pub fn find_patient_by_clinic_number(&self, clinic_number: &str) -> DbResult<Option<Patient>> {
        let sql = format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE clinic_number = ? AND deleted = 0"
        );
        Ok(self
            .conn()
            .query_row(&sql, [clinic_number], patient_from_row)
            .optional()?)
    }

    /// Get a patient by id, tombstones included. Audit/export paths only.
    pub fn get_patient_including_deleted(&self, patient_id: &str) -> DbResult<Option<Patient>> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE patient_id = ?");
        Ok(self
            .conn()
            .query_row(&sql, [patient_id], patient_from_row)
            .optional()?)
    }

    /// Search patients by name substring.
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let sql = format!(
            r#"
            SELECT {PATIENT_COLUMNS} FROM patients
            WHERE deleted = 0
              AND (first_name LIKE '%' || ?1 || '%' OR last_name LIKE '%' || ?1 || '%')
            ORDER BY last_name, first_name
            LIMIT ?2
            "#
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![query, limit as i64], patient_from_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?);
        }
        Ok(patients)
    }

    /// List all live patients.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let sql = format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE deleted = 0 ORDER BY last_name, first_name"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], patient_from_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?);
        }
        Ok(patients)
    }

    /// Soft-delete a patient. The row stays for audit and number generation.
    pub fn soft_delete_patient(&self, patient_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn().execute(
            "UPDATE patients SET deleted = 1, updated_at = datetime('now') WHERE patient_id = ? AND deleted = 0",
            [patient_id],
        )?;
        Ok(rows_affected > 0)
    }
}
