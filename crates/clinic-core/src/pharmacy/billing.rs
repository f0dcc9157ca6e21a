//! Billing derivation: compute an invoice from a dispensed prescription.

use rust_decimal::Decimal;

use super::{PharmacyError, PharmacyResult};
use crate::db::{ConstraintKind, Database};
use crate::models::Billing;
use crate::sequence::{SequenceFamily, SequenceGenerator};

/// Derives and persists invoices. Idempotent per prescription: the first
/// call creates the invoice, every later call returns it unchanged.
pub struct BillingGenerator<'a> {
    db: &'a Database,
}

impl<'a> BillingGenerator<'a> {
    /// Create a new billing generator.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Compute and persist the invoice for `prescription_id`.
    ///
    /// `medication_cost` is the sum over all items of the billable quantity
    /// (dispensed if known, prescribed otherwise) times the frozen unit
    /// price. The existing-invoice check runs twice: once up front, and
    /// again via the UNIQUE(prescription_id) constraint at insert, which
    /// closes the window between the two.
    pub fn generate(
        &self,
        prescription_id: &str,
        consultation_fee: Decimal,
    ) -> PharmacyResult<Billing> {
        let prescription = self.db.get_prescription(prescription_id)?.ok_or_else(|| {
            PharmacyError::NotFound(format!("prescription {}", prescription_id))
        })?;

        if let Some(existing) = self.db.find_billing_for_prescription(prescription_id)? {
            return Ok(existing);
        }

        // A tombstoned patient cannot be billed
        let patient = self
            .db
            .get_patient(&prescription.patient_id)?
            .ok_or_else(|| {
                PharmacyError::InvalidState(format!(
                    "prescription {} has no valid patient association",
                    prescription.prescription_number
                ))
            })?;

        let items = self.db.get_prescription_items(prescription_id)?;
        let medication_cost = items
            .iter()
            .fold(Decimal::ZERO, |total, item| total + item.line_cost());

        let invoice_number =
            SequenceGenerator::new(self.db).next(SequenceFamily::InvoiceNumber)?;
        let billing = Billing::new(
            invoice_number,
            prescription.prescription_id,
            patient.patient_id,
            consultation_fee,
            medication_cost,
        );

        match self.db.insert_billing(&billing) {
            Ok(()) => Ok(billing),
            Err(e) if e.constraint_kind() == Some(ConstraintKind::Unique) => {
                // Lost a race. If the winner billed this prescription,
                // return that row; otherwise the collision was on the
                // invoice number and the transient-retry loop will re-run
                // us with a fresh one.
                match self.db.find_billing_for_prescription(prescription_id)? {
                    Some(existing) => Ok(existing),
                    None => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}
