//! The dispensing workflow: fulfill prescription lines against stock.

use rust_decimal::Decimal;

use super::{PharmacyError, PharmacyResult};
use crate::db::Database;
use crate::models::{Dispensing, Prescription, PrescriptionStatus};
use crate::sequence::{SequenceFamily, SequenceGenerator};

/// One line of a dispense request.
#[derive(Debug, Clone)]
pub struct DispenseLine {
    /// Matching prescription item row id; 0 for an ad-hoc line not tied to
    /// a prescription item
    pub prescription_item_id: i64,
    /// Drug to dispense
    pub drug_code: String,
    /// Quantity to dispense; lines with quantity <= 0 are skipped
    pub quantity: i64,
    /// Unit price charged for this line
    pub unit_price: Decimal,
    /// Free-form notes for this line
    pub notes: Option<String>,
}

/// A request to dispense (part of) a prescription.
#[derive(Debug, Clone)]
pub struct DispenseRequest {
    /// Prescription being fulfilled
    pub prescription_id: String,
    /// Acting pharmacist (staff id)
    pub pharmacist_id: String,
    /// Lines to dispense
    pub lines: Vec<DispenseLine>,
}

/// Result of one dispensing-workflow call.
#[derive(Debug, Clone)]
pub struct DispenseOutcome {
    /// Number shared by all ledger rows of this call
    pub dispensing_number: String,
    /// Ledger rows written, in request order
    pub lines: Vec<Dispensing>,
    /// The prescription after the status flip
    pub prescription: Prescription,
}

/// Validates stock, deducts inventory, appends ledger rows, and flips the
/// prescription status. Performs no transaction management of its own; run
/// it through `Database::run_in_transaction` (see `PharmacyService`).
pub struct DispensingWorkflow<'a> {
    db: &'a Database,
}

impl<'a> DispensingWorkflow<'a> {
    /// Create a new dispensing workflow.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Dispense the eligible lines of `request` as one unit.
    ///
    /// A prescription can be dispensed exactly once, and only from
    /// SentToPharmacy or Processing. Lines with `quantity <= 0` are
    /// silently skipped. A non-zero `prescription_item_id` must name an
    /// item of this prescription; a zero id marks an ad-hoc line that
    /// deducts stock and is logged without touching a prescription item.
    pub fn dispense(&self, request: &DispenseRequest) -> PharmacyResult<DispenseOutcome> {
        if request.lines.is_empty() {
            return Err(PharmacyError::Validation(
                "dispense request has no lines".into(),
            ));
        }

        let prescription = self
            .db
            .get_prescription(&request.prescription_id)?
            .ok_or_else(|| {
                PharmacyError::NotFound(format!("prescription {}", request.prescription_id))
            })?;

        if prescription.status == PrescriptionStatus::Dispensed {
            return Err(PharmacyError::InvalidState(format!(
                "prescription {} is already dispensed",
                prescription.prescription_number
            )));
        }
        if !prescription.status.can_dispense() {
            return Err(PharmacyError::InvalidState(format!(
                "prescription {} is {} and cannot be dispensed",
                prescription.prescription_number,
                prescription.status.as_str()
            )));
        }

        self.db
            .get_staff(&request.pharmacist_id)?
            .ok_or_else(|| PharmacyError::NotFound(format!("staff {}", request.pharmacist_id)))?;

        let eligible: Vec<&DispenseLine> =
            request.lines.iter().filter(|line| line.quantity > 0).collect();
        if eligible.is_empty() {
            return Err(PharmacyError::Validation(
                "no line has a dispensable quantity".into(),
            ));
        }

        // One number covers every ledger row of this call
        let dispensing_number =
            SequenceGenerator::new(self.db).next(SequenceFamily::DispensingNumber)?;

        let mut lines = Vec::with_capacity(eligible.len());
        for line in eligible {
            let drug = self.db.get_drug(&line.drug_code)?.ok_or_else(|| {
                PharmacyError::NotFound(format!("drug {}", line.drug_code))
            })?;

            if !drug.has_stock_for(line.quantity) {
                return Err(PharmacyError::InsufficientStock {
                    drug: drug.code,
                    requested: line.quantity,
                    available: drug.quantity_in_stock,
                });
            }

            let prescription_item_id = if line.prescription_item_id != 0 {
                let item = self
                    .db
                    .get_prescription_item(line.prescription_item_id)?
                    .filter(|item| item.prescription_id == prescription.prescription_id)
                    .ok_or_else(|| {
                        PharmacyError::InvalidState(format!(
                            "item {} does not belong to prescription {}",
                            line.prescription_item_id, prescription.prescription_number
                        ))
                    })?;
                self.db.set_item_quantity_dispensed(item.id, line.quantity)?;
                Some(item.id)
            } else {
                None
            };

            let stock_before = drug.quantity_in_stock;
            let stock_after = stock_before - line.quantity;
            self.db.set_drug_stock(&drug.code, stock_after)?;

            let mut row = Dispensing {
                id: 0,
                dispensing_number: dispensing_number.clone(),
                prescription_id: prescription.prescription_id.clone(),
                prescription_item_id,
                drug_code: drug.code,
                quantity: line.quantity,
                unit_price: line.unit_price,
                stock_before,
                stock_after,
                pharmacist_id: request.pharmacist_id.clone(),
                notes: line.notes.clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
            };
            row.id = self.db.insert_dispensing(&row)?;
            lines.push(row);
        }

        self.db
            .mark_prescription_dispensed(&prescription.prescription_id, &request.pharmacist_id)?;
        let prescription = self
            .db
            .get_prescription(&prescription.prescription_id)?
            .ok_or_else(|| {
                PharmacyError::NotFound(format!("prescription {}", request.prescription_id))
            })?;

        Ok(DispenseOutcome {
            dispensing_number,
            lines,
            prescription,
        })
    }
}
