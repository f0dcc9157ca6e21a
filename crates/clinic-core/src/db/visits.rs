//! Visit database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Visit, VisitStatus};

/// Intermediate row struct for database mapping.
struct VisitRow {
    visit_id: String,
    visit_number: String,
    patient_id: String,
    doctor_id: String,
    reason: Option<String>,
    diagnosis: Option<String>,
    notes: Option<String>,
    status: String,
    deleted: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<VisitRow> for Visit {
    type Error = DbError;

    fn try_from(row: VisitRow) -> Result<Self, Self::Error> {
        let status = VisitStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown visit status: {}", row.status)))?;
        Ok(Visit {
            visit_id: row.visit_id,
            visit_number: row.visit_number,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            reason: row.reason,
            diagnosis: row.diagnosis,
            notes: row.notes,
            status,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const VISIT_SELECT: &str = r#"
    SELECT visit_id, visit_number, patient_id, doctor_id, reason, diagnosis,
           notes, status, deleted, created_at, updated_at
    FROM visits
"#;

fn visit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VisitRow> {
    Ok(VisitRow {
        visit_id: row.get(0)?,
        visit_number: row.get(1)?,
        patient_id: row.get(2)?,
        doctor_id: row.get(3)?,
        reason: row.get(4)?,
        diagnosis: row.get(5)?,
        notes: row.get(6)?,
        status: row.get(7)?,
        deleted: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl Database {
    /// Insert a new visit.
    pub fn insert_visit(&self, visit: &Visit) -> DbResult<()> {
        self.conn().execute(
            r#"
            INSERT INTO visits (
                visit_id, visit_number, patient_id, doctor_id, reason, diagnosis,
                notes, status, deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                visit.visit_id,
                visit.visit_number,
                visit.patient_id,
                visit.doctor_id,
                visit.reason,
                visit.diagnosis,
                visit.notes,
                visit.status.as_str(),
                visit.deleted,
                visit.created_at,
                visit.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a visit by id. Tombstoned rows are invisible here.
    pub fn get_visit(&self, visit_id: &str) -> DbResult<Option<Visit>> {
        let sql = format!("{VISIT_SELECT} WHERE visit_id = ? AND deleted = 0");
        self.conn()
            .query_row(&sql, [visit_id], visit_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List live visits for a patient, most recent first.
    pub fn list_visits_for_patient(&self, patient_id: &str) -> DbResult<Vec<Visit>> {
        let sql = format!(
            "{VISIT_SELECT} WHERE patient_id = ? AND deleted = 0 ORDER BY created_at DESC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([patient_id], visit_row)?;

        let mut visits = Vec::new();
        for row in rows {
            visits.push(row?.try_into()?);
        }
        Ok(visits)
    }

    /// Update a visit's status plus the doctor's findings.
    pub fn update_visit(&self, visit: &Visit) -> DbResult<bool> {
        let rows_affected = self.conn().execute(
            r#"
            UPDATE visits SET
                reason = ?2,
                diagnosis = ?3,
                notes = ?4,
                status = ?5,
                updated_at = datetime('now')
            WHERE visit_id = ?1 AND deleted = 0
            "#,
            params![
                visit.visit_id,
                visit.reason,
                visit.diagnosis,
                visit.notes,
                visit.status.as_str(),
            ],
        )?;
        Ok(rows_affected > 0)
    }
}
