//! Pharmacy workflows.
//!
//! Pipeline: prescription arrives → stock validated and deducted →
//! ledger rows appended → status flipped to Dispensed → invoice derived.
//! The composed fulfillment runs all of it in one retryable transaction.

mod billing;
mod dispensing;

pub use billing::*;
pub use dispensing::*;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::db::{Database, DbError, TransientError};
use crate::models::{Billing, Drug, PaymentStatus, StockAdjustment};

/// Pharmacy errors.
#[derive(Error, Debug)]
pub enum PharmacyError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient stock of {drug}: requested {requested}, available {available}")]
    InsufficientStock {
        drug: String,
        requested: i64,
        available: i64,
    },
}

pub type PharmacyResult<T> = Result<T, PharmacyError>;

impl TransientError for PharmacyError {
    fn is_transient(&self) -> bool {
        match self {
            PharmacyError::Database(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Everything produced by one fulfillment call.
#[derive(Debug, Clone)]
pub struct FulfillmentOutcome {
    /// Result of the dispensing workflow
    pub dispensing: DispenseOutcome,
    /// The derived (or pre-existing) invoice
    pub billing: Billing,
}

/// Caller-facing pharmacy operations. Each call is one unit of work:
/// wrapped in a transaction and retried as a whole on transient failure,
/// which the idempotency guards inside make safe.
pub struct PharmacyService<'a> {
    db: &'a Database,
}

impl<'a> PharmacyService<'a> {
    /// Create a new pharmacy service.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Dispense a prescription and derive its invoice, atomically.
    ///
    /// Either the full set of eligible lines is deducted, logged, and
    /// billed, or nothing changes.
    pub fn fulfill_prescription(
        &self,
        request: &DispenseRequest,
        consultation_fee: Decimal,
    ) -> PharmacyResult<FulfillmentOutcome> {
        self.db.run_in_transaction(|db| {
            let dispensing = DispensingWorkflow::new(db).dispense(request)?;
            let billing =
                BillingGenerator::new(db).generate(&request.prescription_id, consultation_fee)?;
            Ok(FulfillmentOutcome {
                dispensing,
                billing,
            })
        })
    }

    /// Derive the invoice for a prescription on its own. Idempotent: a
    /// second call returns the existing invoice.
    pub fn generate_billing(
        &self,
        prescription_id: &str,
        consultation_fee: Decimal,
    ) -> PharmacyResult<Billing> {
        self.db.run_in_transaction(|db| {
            BillingGenerator::new(db).generate(prescription_id, consultation_fee)
        })
    }

    /// Record a payment against an invoice and re-derive its status.
    pub fn record_payment(&self, billing_id: &str, amount: Decimal) -> PharmacyResult<Billing> {
        if amount <= Decimal::ZERO {
            return Err(PharmacyError::Validation(format!(
                "payment amount must be positive, got {}",
                amount
            )));
        }
        self.db.run_in_transaction(|db| {
            let billing = db
                .get_billing(billing_id)?
                .ok_or_else(|| PharmacyError::NotFound(format!("billing {}", billing_id)))?;

            let amount_paid = billing.amount_paid + amount;
            let payment_status = PaymentStatus::derive(amount_paid, billing.total_amount);
            db.update_billing_payment(billing_id, amount_paid, payment_status)?;

            Ok(Billing {
                amount_paid,
                payment_status,
                ..billing
            })
        })
    }

    /// Manually adjust a drug's stock (deliveries, stock-takes,
    /// write-offs), recording the change in the adjustment ledger.
    pub fn adjust_stock(
        &self,
        drug_code: &str,
        delta: i64,
        staff_id: &str,
        reason: Option<String>,
    ) -> PharmacyResult<Drug> {
        if delta == 0 {
            return Err(PharmacyError::Validation(
                "stock adjustment delta must be non-zero".into(),
            ));
        }
        self.db.run_in_transaction(|db| {
            let drug = db
                .get_drug(drug_code)?
                .ok_or_else(|| PharmacyError::NotFound(format!("drug {}", drug_code)))?;
            db.get_staff(staff_id)?
                .ok_or_else(|| PharmacyError::NotFound(format!("staff {}", staff_id)))?;

            let stock_before = drug.quantity_in_stock;
            let stock_after = stock_before + delta;
            if stock_after < 0 {
                return Err(PharmacyError::InsufficientStock {
                    drug: drug.code.clone(),
                    requested: -delta,
                    available: stock_before,
                });
            }

            db.set_drug_stock(drug_code, stock_after)?;
            db.insert_stock_adjustment(&StockAdjustment {
                id: 0,
                drug_code: drug.code.clone(),
                delta,
                stock_before,
                stock_after,
                staff_id: staff_id.to_string(),
                reason: reason.clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
            })?;

            Ok(Drug {
                quantity_in_stock: stock_after,
                ..drug
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Drug, Staff, StaffRole};

    fn setup_db() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let staff = Staff::new("EMP-0001".into(), "Amina Okafor".into(), StaffRole::Pharmacist);
        db.insert_staff(&staff).unwrap();

        let mut drug = Drug::new("PARA-500".into(), "Panadol 500mg".into());
        drug.quantity_in_stock = 10;
        db.upsert_drug(&drug).unwrap();
        (db, staff.staff_id)
    }

    #[test]
    fn test_adjust_stock_records_ledger() {
        let (db, staff_id) = setup_db();
        let service = PharmacyService::new(&db);

        let drug = service
            .adjust_stock("PARA-500", 90, &staff_id, Some("delivery".into()))
            .unwrap();
        assert_eq!(drug.quantity_in_stock, 100);

        let ledger = db.list_stock_adjustments_for_drug("PARA-500").unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].stock_before, 10);
        assert_eq!(ledger[0].stock_after, 100);
        assert_eq!(ledger[0].delta, 90);
    }

    #[test]
    fn test_adjust_stock_rejects_negative_result() {
        let (db, staff_id) = setup_db();
        let service = PharmacyService::new(&db);

        let err = service
            .adjust_stock("PARA-500", -11, &staff_id, None)
            .unwrap_err();
        assert!(matches!(err, PharmacyError::InsufficientStock { available: 10, .. }));

        // Nothing changed
        assert_eq!(
            db.get_drug("PARA-500").unwrap().unwrap().quantity_in_stock,
            10
        );
        assert!(db.list_stock_adjustments_for_drug("PARA-500").unwrap().is_empty());
    }

    #[test]
    fn test_adjust_stock_rejects_zero_delta() {
        let (db, staff_id) = setup_db();
        let service = PharmacyService::new(&db);
        assert!(matches!(
            service.adjust_stock("PARA-500", 0, &staff_id, None),
            Err(PharmacyError::Validation(_))
        ));
    }

    #[test]
    fn test_adjust_stock_unknown_drug() {
        let (db, staff_id) = setup_db();
        let service = PharmacyService::new(&db);
        assert!(matches!(
            service.adjust_stock("NOPE", 5, &staff_id, None),
            Err(PharmacyError::NotFound(_))
        ));
    }
}
