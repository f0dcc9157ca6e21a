//! Identifier-sequence queries.
//!
//! These deliberately ignore the `deleted` flag: a tombstoned row still owns
//! its number, and that number must never be reissued.

use super::{Database, DbResult};
use crate::sequence::SequenceFamily;
use rusqlite::OptionalExtension;

impl Database {
    /// Find the lexicographically greatest stored identifier starting with
    /// `prefix` for the given family, soft-deleted rows included.
    pub fn max_identifier(
        &self,
        family: SequenceFamily,
        prefix: &str,
    ) -> DbResult<Option<String>> {
        let sql = match family {
            SequenceFamily::ClinicNumber => {
                "SELECT clinic_number FROM patients WHERE clinic_number LIKE ?1 ORDER BY clinic_number DESC LIMIT 1"
            }
            SequenceFamily::EmployeeNumber => {
                "SELECT employee_number FROM staff WHERE employee_number LIKE ?1 ORDER BY employee_number DESC LIMIT 1"
            }
            SequenceFamily::VisitNumber => {
                "SELECT visit_number FROM visits WHERE visit_number LIKE ?1 ORDER BY visit_number DESC LIMIT 1"
            }
            SequenceFamily::PrescriptionNumber => {
                "SELECT prescription_number FROM prescriptions WHERE prescription_number LIKE ?1 ORDER BY prescription_number DESC LIMIT 1"
            }
            SequenceFamily::DispensingNumber => {
                "SELECT dispensing_number FROM dispensings WHERE dispensing_number LIKE ?1 ORDER BY dispensing_number DESC LIMIT 1"
            }
            SequenceFamily::InvoiceNumber => {
                "SELECT invoice_number FROM billings WHERE invoice_number LIKE ?1 ORDER BY invoice_number DESC LIMIT 1"
            }
        };

        let pattern = format!("{}%", prefix);
        Ok(self
            .conn()
            .query_row(sql, [pattern], |row| row.get(0))
            .optional()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;

    #[test]
    fn test_max_identifier_empty() {
        let db = Database::open_in_memory().unwrap();
        let max = db
            .max_identifier(SequenceFamily::ClinicNumber, "CLN-2024-")
            .unwrap();
        assert!(max.is_none());
    }

    #[test]
    fn test_max_identifier_picks_greatest_regardless_of_insert_order() {
        let db = Database::open_in_memory().unwrap();
        for n in [3, 1, 7, 2] {
            let patient = Patient::new(
                format!("CLN-2024-{:05}", n),
                "Jane".into(),
                format!("Doe{}", n),
            );
            db.insert_patient(&patient).unwrap();
        }

        let max = db
            .max_identifier(SequenceFamily::ClinicNumber, "CLN-2024-")
            .unwrap();
        assert_eq!(max.as_deref(), Some("CLN-2024-00007"));
    }

    #[test]
    fn test_max_identifier_scoped_by_prefix() {
        let db = Database::open_in_memory().unwrap();
        db.insert_patient(&Patient::new("CLN-2023-00009".into(), "A".into(), "B".into()))
            .unwrap();
        db.insert_patient(&Patient::new("CLN-2024-00002".into(), "C".into(), "D".into()))
            .unwrap();

        let max = db
            .max_identifier(SequenceFamily::ClinicNumber, "CLN-2024-")
            .unwrap();
        assert_eq!(max.as_deref(), Some("CLN-2024-00002"));
    }

    #[test]
    fn test_max_identifier_sees_tombstones() {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("CLN-2024-00005".into(), "Jane".into(), "Doe".into());
        db.insert_patient(&patient).unwrap();
        db.soft_delete_patient(&patient.patient_id).unwrap();

        // The deleted patient's number still counts
        let max = db
            .max_identifier(SequenceFamily::ClinicNumber, "CLN-2024-")
            .unwrap();
        assert_eq!(max.as_deref(), Some("CLN-2024-00005"));
    }
}
