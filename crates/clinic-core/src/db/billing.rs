//! Billing database operations.

use rust_decimal::Decimal;
use rusqlite::{params, OptionalExtension};
use std::str::FromStr;

use super::{Database, DbError, DbResult};
use crate::models::{Billing, PaymentStatus};

/// Intermediate row struct for database mapping.
struct BillingRow {
    billing_id: String,
    invoice_number: String,
    prescription_id: String,
    patient_id: String,
    consultation_fee: String,
    medication_cost: String,
    total_amount: String,
    amount_paid: String,
    payment_status: String,
    deleted: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<BillingRow> for Billing {
    type Error = DbError;

    fn try_from(row: BillingRow) -> Result<Self, Self::Error> {
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            DbError::Constraint(format!("Unknown payment status: {}", row.payment_status))
        })?;
        Ok(Billing {
            billing_id: row.billing_id,
            invoice_number: row.invoice_number,
            prescription_id: row.prescription_id,
            patient_id: row.patient_id,
            consultation_fee: Decimal::from_str(&row.consultation_fee)?,
            medication_cost: Decimal::from_str(&row.medication_cost)?,
            total_amount: Decimal::from_str(&row.total_amount)?,
            amount_paid: Decimal::from_str(&row.amount_paid)?,
            payment_status,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const BILLING_SELECT: &str = r#"
    SELECT billing_id, invoice_number, prescription_id, patient_id,
           consultation_fee, medication_cost, total_amount, amount_paid,
           payment_status, deleted, created_at, updated_at
    FROM billings
"#;

fn billing_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BillingRow> {
    Ok(BillingRow {
        billing_id: row.get(0)?,
        invoice_number: row.get(1)?,
        prescription_id: row.get(2)?,
        patient_id: row.get(3)?,
        consultation_fee: row.get(4)?,
        medication_cost: row.get(5)?,
        total_amount: row.get(6)?,
        amount_paid: row.get(7)?,
        payment_status: row.get(8)?,
        deleted: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

impl Database {
    /// Insert a new billing. The UNIQUE(prescription_id) constraint is the
    /// final word on the one-invoice-per-prescription rule.
    pub fn insert_billing(&self, billing: &Billing) -> DbResult<()> {
        self.conn().execute(
            r#"
            INSERT INTO billings (
                billing_id, invoice_number, prescription_id, patient_id,
                consultation_fee, medication_cost, total_amount, amount_paid,
                payment_status, deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                billing.billing_id,
                billing.invoice_number,
                billing.prescription_id,
                billing.patient_id,
                billing.consultation_fee.to_string(),
                billing.medication_cost.to_string(),
                billing.total_amount.to_string(),
                billing.amount_paid.to_string(),
                billing.payment_status.as_str(),
                billing.deleted,
                billing.created_at,
                billing.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a billing by id. Tombstoned rows are invisible here.
    pub fn get_billing(&self, billing_id: &str) -> DbResult<Option<Billing>> {
        let sql = format!("{BILLING_SELECT} WHERE billing_id = ? AND deleted = 0");
        self.conn()
            .query_row(&sql, [billing_id], billing_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Find the billing for a prescription. This is the idempotency check
    /// for billing generation, so tombstoned rows are included: a retired
    /// invoice still blocks a second one for the same prescription.
    pub fn find_billing_for_prescription(&self, prescription_id: &str) -> DbResult<Option<Billing>> {
        let sql = format!("{BILLING_SELECT} WHERE prescription_id = ?");
        self.conn()
            .query_row(&sql, [prescription_id], billing_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Record a new paid amount and derived status.
    pub fn update_billing_payment(
        &self,
        billing_id: &str,
        amount_paid: Decimal,
        payment_status: PaymentStatus,
    ) -> DbResult<bool> {
        let rows_affected = self.conn().execute(
            r#"
            UPDATE billings SET
                amount_paid = ?2,
                payment_status = ?3,
                updated_at = datetime('now')
            WHERE billing_id = ?1 AND deleted = 0
            "#,
            params![billing_id, amount_paid.to_string(), payment_status.as_str()],
        )?;
        Ok(rows_affected > 0)
    }

    /// List all live billings, most recent first.
    pub fn list_billings(&self) -> DbResult<Vec<Billing>> {
        let sql = format!("{BILLING_SELECT} WHERE deleted = 0 ORDER BY created_at DESC");
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], billing_row)?;

        let mut billings = Vec::new();
        for row in rows {
            billings.push(row?.try_into()?);
        }
        Ok(billings)
    }

    /// List live billings created at or after the given timestamp.
    pub fn list_billings_since(&self, since: &str) -> DbResult<Vec<Billing>> {
        let sql = format!(
            "{BILLING_SELECT} WHERE deleted = 0 AND created_at >= ? ORDER BY created_at"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([since], billing_row)?;

        let mut billings = Vec::new();
        for row in rows {
            billings.push(row?.try_into()?);
        }
        Ok(billings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Patient, Prescription, Staff, StaffRole};

    fn setup_db() -> (Database, String, String) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("CLN-2024-00001".into(), "Jane".into(), "Doe".into());
        db.insert_patient(&patient).unwrap();
        let doctor = Staff::new("EMP-0001".into(), "Dr. Okafor".into(), StaffRole::Doctor);
        db.insert_staff(&doctor).unwrap();
        let prescription = Prescription::new(
            "RX-20240115-0001".into(),
            patient.patient_id.clone(),
            doctor.staff_id,
        );
        db.insert_prescription(&prescription, &[]).unwrap();
        (db, prescription.prescription_id, patient.patient_id)
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_insert_and_find() {
        let (db, prescription_id, patient_id) = setup_db();
        let billing = Billing::new(
            "INV-20240115-0001".into(),
            prescription_id.clone(),
            patient_id,
            dec("20"),
            dec("11.00"),
        );
        db.insert_billing(&billing).unwrap();

        let found = db
            .find_billing_for_prescription(&prescription_id)
            .unwrap()
            .unwrap();
        assert_eq!(found.billing_id, billing.billing_id);
        assert_eq!(found.total_amount, dec("31.00"));
        assert_eq!(found.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_second_billing_for_prescription_rejected() {
        let (db, prescription_id, patient_id) = setup_db();
        let first = Billing::new(
            "INV-20240115-0001".into(),
            prescription_id.clone(),
            patient_id.clone(),
            dec("0"),
            dec("10"),
        );
        db.insert_billing(&first).unwrap();

        let second = Billing::new(
            "INV-20240115-0002".into(),
            prescription_id,
            patient_id,
            dec("0"),
            dec("10"),
        );
        let err = db.insert_billing(&second).unwrap_err();
        assert_eq!(err.constraint_kind(), Some(super::super::ConstraintKind::Unique));
    }

    #[test]
    fn test_update_payment() {
        let (db, prescription_id, patient_id) = setup_db();
        let billing = Billing::new(
            "INV-20240115-0001".into(),
            prescription_id,
            patient_id,
            dec("20"),
            dec("11.00"),
        );
        db.insert_billing(&billing).unwrap();

        db.update_billing_payment(&billing.billing_id, dec("10"), PaymentStatus::PartiallyPaid)
            .unwrap();
        let updated = db.get_billing(&billing.billing_id).unwrap().unwrap();
        assert_eq!(updated.amount_paid, dec("10"));
        assert_eq!(updated.payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(updated.balance(), dec("21.00"));
    }
}
