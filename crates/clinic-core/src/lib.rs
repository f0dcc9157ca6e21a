//! Clinic Core Library
//!
//! Embedded clinic management core: patient registration, visits,
//! prescription writing, pharmacy dispensing, and billing over a local
//! SQLite store.
//!
//! # Architecture
//!
//! ```text
//!  Registration Desk          Doctor                 Pharmacy
//!  (clinic number)            (visit, prescription)  (dispense)
//!        │                        │                      │
//!        ▼                        ▼                      ▼
//!  ┌─────────────────────────────────────────────────────────────┐
//!  │                  Transactional Unit of Work                 │
//!  │   BEGIN IMMEDIATE · run closure · COMMIT / ROLLBACK · retry │
//!  └──────────────────────────────┬──────────────────────────────┘
//!                                 │
//!              ┌──────────────────┼──────────────────┐
//!              ▼                  ▼                  ▼
//!        Sequence            Dispensing          Billing
//!        Generator           Workflow            Derivation
//!        (CLN/RX/DSP/…)      (stock + ledger)    (idempotent invoice)
//! ```
//!
//! # Core Principle
//!
//! **Dispensing and billing commit together or not at all.** Stock
//! deduction, ledger rows, the status flip, and the derived invoice share
//! one transaction; identifier generation is optimistic and relies on
//! UNIQUE constraints plus whole-transaction retry.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer with the retryable unit of work
//! - [`models`]: Domain types (Patient, Drug, Prescription, Billing, etc.)
//! - [`sequence`]: Prefixed, zero-padded identifier sequences
//! - [`records`]: Registration, visits, prescription writing
//! - [`pharmacy`]: Dispensing workflow, billing derivation, stock adjustment
//! - [`export`]: Invoice export (JSON/CSV)

pub mod db;
pub mod export;
pub mod models;
pub mod pharmacy;
pub mod records;
pub mod sequence;

// Re-export commonly used types
pub use db::Database;
pub use models::{
    Billing, Dispensing, Drug, Patient, PaymentStatus, Prescription, PrescriptionItem,
    PrescriptionStatus, Staff, StaffRole, StockAdjustment, Visit, VisitStatus,
};
pub use pharmacy::{
    BillingGenerator, DispenseLine, DispenseOutcome, DispenseRequest, DispensingWorkflow,
    FulfillmentOutcome, PharmacyService,
};
pub use records::{NewPatient, NewPrescriptionItem, Registrar};
pub use sequence::{SequenceFamily, SequenceGenerator};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use db::DbError;
use pharmacy::PharmacyError;
use records::RecordsError;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Constraint conflict: {0}")]
    ConstraintConflict(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<DbError> for ClinicError {
    fn from(e: DbError) -> Self {
        match &e {
            DbError::NotFound(what) => ClinicError::NotFound(what.clone()),
            _ => match e.constraint_kind() {
                Some(kind) => ClinicError::ConstraintConflict(format!("{:?}: {}", kind, e)),
                None => ClinicError::DatabaseError(e.to_string()),
            },
        }
    }
}

impl From<PharmacyError> for ClinicError {
    fn from(e: PharmacyError) -> Self {
        match e {
            PharmacyError::Database(db) => db.into(),
            PharmacyError::NotFound(what) => ClinicError::NotFound(what),
            PharmacyError::InvalidState(what) => ClinicError::InvalidState(what),
            PharmacyError::Validation(what) => ClinicError::ValidationError(what),
            e @ PharmacyError::InsufficientStock { .. } => {
                ClinicError::InsufficientStock(e.to_string())
            }
        }
    }
}

impl From<RecordsError> for ClinicError {
    fn from(e: RecordsError) -> Self {
        match e {
            RecordsError::Database(db) => db.into(),
            RecordsError::NotFound(what) => ClinicError::NotFound(what),
            RecordsError::InvalidState(what) => ClinicError::InvalidState(what),
            RecordsError::Validation(what) => ClinicError::ValidationError(what),
        }
    }
}

impl From<serde_json::Error> for ClinicError {
    fn from(e: serde_json::Error) -> Self {
        ClinicError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

fn parse_money(field: &str, value: &str) -> Result<Decimal, ClinicError> {
    Decimal::from_str(value)
        .map_err(|_| ClinicError::ValidationError(format!("{} is not a valid amount: {}", field, value)))
}

/// Consultation fees are optional at the boundary; absent means zero.
fn parse_fee(value: Option<&str>) -> Result<Decimal, ClinicError> {
    match value {
        Some(v) => parse_money("consultation_fee", v),
        None => Ok(Decimal::ZERO),
    }
}

fn parse_role(value: &str) -> Result<StaffRole, ClinicError> {
    StaffRole::parse(value)
        .ok_or_else(|| ClinicError::ValidationError(format!("unknown staff role: {}", value)))
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a clinic database at the given path.
#[uniffi::export]
pub fn open_clinic(path: String) -> Result<Arc<ClinicCore>, ClinicError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(ClinicCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Create an in-memory clinic database (for testing).
#[uniffi::export]
pub fn open_clinic_in_memory() -> Result<Arc<ClinicCore>, ClinicError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(ClinicCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicCore {
    db: Arc<Mutex<Database>>,
}

#[uniffi::export]
impl ClinicCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Register a patient, assigning the next clinic number.
    pub fn register_patient(
        &self,
        first_name: String,
        last_name: String,
        date_of_birth: Option<String>,
        phone: Option<String>,
        address: Option<String>,
    ) -> Result<FfiPatient, ClinicError> {
        let db = self.db.lock()?;
        let patient = Registrar::new(&db).register_patient(&NewPatient {
            first_name,
            last_name,
            date_of_birth,
            phone,
            address,
            notes: None,
        })?;
        Ok(patient.into())
    }

    /// Get a patient by id.
    pub fn get_patient(&self, patient_id: String) -> Result<Option<FfiPatient>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_patient(&patient_id)?.map(|p| p.into()))
    }

    /// Get a patient by clinic number.
    pub fn find_patient_by_clinic_number(
        &self,
        clinic_number: String,
    ) -> Result<Option<FfiPatient>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db
            .find_patient_by_clinic_number(&clinic_number)?
            .map(|p| p.into()))
    }

    /// Search patients by name.
    pub fn search_patients(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiPatient>, ClinicError> {
        let db = self.db.lock()?;
        let patients = db.search_patients(&query, limit as usize)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Update a patient's demographic fields.
    pub fn update_patient(&self, patient: FfiPatient) -> Result<FfiPatient, ClinicError> {
        let db = self.db.lock()?;
        let mut model = db
            .get_patient(&patient.patient_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("patient {}", patient.patient_id)))?;
        model.first_name = patient.first_name;
        model.last_name = patient.last_name;
        model.date_of_birth = patient.date_of_birth;
        model.phone = patient.phone;
        model.address = patient.address;
        model.notes = patient.notes;
        db.update_patient(&model)?;
        Ok(model.into())
    }

    /// Soft-delete a patient.
    pub fn remove_patient(&self, patient_id: String) -> Result<(), ClinicError> {
        let db = self.db.lock()?;
        Registrar::new(&db).remove_patient(&patient_id)?;
        Ok(())
    }

    // =========================================================================
    // Staff Operations
    // =========================================================================

    /// Add a staff member, assigning the next employee number.
    pub fn add_staff(&self, full_name: String, role: String) -> Result<FfiStaff, ClinicError> {
        let role = parse_role(&role)?;
        let db = self.db.lock()?;
        let staff = Registrar::new(&db).add_staff(&full_name, role)?;
        Ok(staff.into())
    }

    /// Get a staff member by id.
    pub fn get_staff(&self, staff_id: String) -> Result<Option<FfiStaff>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_staff(&staff_id)?.map(|s| s.into()))
    }

    /// List staff, optionally restricted to one role.
    pub fn list_staff(&self, role: Option<String>) -> Result<Vec<FfiStaff>, ClinicError> {
        let role = role.as_deref().map(parse_role).transpose()?;
        let db = self.db.lock()?;
        let staff = db.list_staff(role)?;
        Ok(staff.into_iter().map(|s| s.into()).collect())
    }

    /// Soft-delete a staff member.
    pub fn remove_staff(&self, staff_id: String) -> Result<(), ClinicError> {
        let db = self.db.lock()?;
        Registrar::new(&db).remove_staff(&staff_id)?;
        Ok(())
    }

    // =========================================================================
    // Drug Catalog Operations
    // =========================================================================

    /// Add or update a drug.
    pub fn upsert_drug(&self, drug: FfiDrug) -> Result<(), ClinicError> {
        let drug: Drug = drug.try_into()?;
        let db = self.db.lock()?;
        db.upsert_drug(&drug)?;
        Ok(())
    }

    /// Get a drug by code.
    pub fn get_drug(&self, code: String) -> Result<Option<FfiDrug>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_drug(&code)?.map(|d| d.into()))
    }

    /// Search drugs by code/name/generic name.
    pub fn search_drugs(&self, query: String, limit: u32) -> Result<Vec<FfiDrug>, ClinicError> {
        let db = self.db.lock()?;
        let drugs = db.search_drugs(&query, limit as usize)?;
        Ok(drugs.into_iter().map(|d| d.into()).collect())
    }

    /// List all drugs.
    pub fn list_drugs(&self) -> Result<Vec<FfiDrug>, ClinicError> {
        let db = self.db.lock()?;
        let drugs = db.list_drugs()?;
        Ok(drugs.into_iter().map(|d| d.into()).collect())
    }

    /// List drugs at or below their reorder level.
    pub fn list_low_stock_drugs(&self) -> Result<Vec<FfiDrug>, ClinicError> {
        let db = self.db.lock()?;
        let drugs = db.list_low_stock_drugs()?;
        Ok(drugs.into_iter().map(|d| d.into()).collect())
    }

    /// Manually adjust a drug's stock, recording the adjustment ledger row.
    pub fn adjust_drug_stock(
        &self,
        code: String,
        delta: i64,
        staff_id: String,
        reason: Option<String>,
    ) -> Result<FfiDrug, ClinicError> {
        let db = self.db.lock()?;
        let drug = PharmacyService::new(&db).adjust_stock(&code, delta, &staff_id, reason)?;
        Ok(drug.into())
    }

    /// List the stock-adjustment ledger for a drug, most recent first.
    pub fn list_stock_adjustments(
        &self,
        code: String,
    ) -> Result<Vec<FfiStockAdjustment>, ClinicError> {
        let db = self.db.lock()?;
        let rows = db.list_stock_adjustments_for_drug(&code)?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Soft-delete a drug.
    pub fn remove_drug(&self, code: String) -> Result<(), ClinicError> {
        let db = self.db.lock()?;
        if !db.soft_delete_drug(&code)? {
            return Err(ClinicError::NotFound(format!("drug {}", code)));
        }
        Ok(())
    }

    // =========================================================================
    // Visit Operations
    // =========================================================================

    /// Record a visit, assigning the next visit number.
    pub fn record_visit(
        &self,
        patient_id: String,
        doctor_id: String,
        reason: Option<String>,
    ) -> Result<FfiVisit, ClinicError> {
        let db = self.db.lock()?;
        let visit = Registrar::new(&db).record_visit(&patient_id, &doctor_id, reason)?;
        Ok(visit.into())
    }

    /// Complete a scheduled visit with the doctor's findings.
    pub fn complete_visit(
        &self,
        visit_id: String,
        diagnosis: Option<String>,
        notes: Option<String>,
    ) -> Result<FfiVisit, ClinicError> {
        let db = self.db.lock()?;
        let visit = Registrar::new(&db).complete_visit(&visit_id, diagnosis, notes)?;
        Ok(visit.into())
    }

    /// Cancel a scheduled visit.
    pub fn cancel_visit(&self, visit_id: String) -> Result<FfiVisit, ClinicError> {
        let db = self.db.lock()?;
        let visit = Registrar::new(&db).cancel_visit(&visit_id)?;
        Ok(visit.into())
    }

    /// Get a visit by id.
    pub fn get_visit(&self, visit_id: String) -> Result<Option<FfiVisit>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_visit(&visit_id)?.map(|v| v.into()))
    }

    /// List visits for a patient, most recent first.
    pub fn list_visits_for_patient(
        &self,
        patient_id: String,
    ) -> Result<Vec<FfiVisit>, ClinicError> {
        let db = self.db.lock()?;
        let visits = db.list_visits_for_patient(&patient_id)?;
        Ok(visits.into_iter().map(|v| v.into()).collect())
    }

    // =========================================================================
    // Prescription Operations
    // =========================================================================

    /// Write a prescription. Unit prices are frozen from the catalog.
    pub fn create_prescription(
        &self,
        patient_id: String,
        doctor_id: String,
        visit_id: Option<String>,
        items: Vec<FfiNewPrescriptionItem>,
        notes: Option<String>,
    ) -> Result<FfiPrescription, ClinicError> {
        let items: Vec<NewPrescriptionItem> = items
            .into_iter()
            .map(|item| NewPrescriptionItem {
                drug_code: item.drug_code,
                quantity: item.quantity,
                dosage: item.dosage,
            })
            .collect();

        let db = self.db.lock()?;
        let (prescription, saved_items) = Registrar::new(&db).create_prescription(
            &patient_id,
            &doctor_id,
            visit_id.as_deref(),
            &items,
            notes,
        )?;
        Ok(prescription_to_ffi(prescription, saved_items))
    }

    /// Get a prescription (with items) by id.
    pub fn get_prescription(
        &self,
        prescription_id: String,
    ) -> Result<Option<FfiPrescription>, ClinicError> {
        let db = self.db.lock()?;
        match db.get_prescription(&prescription_id)? {
            Some(prescription) => {
                let items = db.get_prescription_items(&prescription.prescription_id)?;
                Ok(Some(prescription_to_ffi(prescription, items)))
            }
            None => Ok(None),
        }
    }

    /// Get a prescription (with items) by its number.
    pub fn find_prescription_by_number(
        &self,
        prescription_number: String,
    ) -> Result<Option<FfiPrescription>, ClinicError> {
        let db = self.db.lock()?;
        match db.find_prescription_by_number(&prescription_number)? {
            Some(prescription) => {
                let items = db.get_prescription_items(&prescription.prescription_id)?;
                Ok(Some(prescription_to_ffi(prescription, items)))
            }
            None => Ok(None),
        }
    }

    /// List prescriptions for a patient, without items.
    pub fn list_prescriptions_for_patient(
        &self,
        patient_id: String,
    ) -> Result<Vec<FfiPrescription>, ClinicError> {
        let db = self.db.lock()?;
        let prescriptions = db.list_prescriptions_for_patient(&patient_id)?;
        Ok(prescriptions
            .into_iter()
            .map(|p| prescription_to_ffi(p, Vec::new()))
            .collect())
    }

    /// Hand a draft prescription to the pharmacy queue.
    pub fn send_to_pharmacy(
        &self,
        prescription_id: String,
    ) -> Result<FfiPrescription, ClinicError> {
        self.transition(prescription_id, |registrar, id| registrar.send_to_pharmacy(id))
    }

    /// Mark a queued prescription as being prepared.
    pub fn mark_processing(
        &self,
        prescription_id: String,
    ) -> Result<FfiPrescription, ClinicError> {
        self.transition(prescription_id, |registrar, id| registrar.mark_processing(id))
    }

    /// Mark a prescription as waiting at the pickup counter.
    pub fn mark_ready_for_pickup(
        &self,
        prescription_id: String,
    ) -> Result<FfiPrescription, ClinicError> {
        self.transition(prescription_id, |registrar, id| {
            registrar.mark_ready_for_pickup(id)
        })
    }

    /// Cancel a prescription that has not been dispensed.
    pub fn cancel_prescription(
        &self,
        prescription_id: String,
    ) -> Result<FfiPrescription, ClinicError> {
        self.transition(prescription_id, |registrar, id| {
            registrar.cancel_prescription(id)
        })
    }

    /// Soft-delete a draft or cancelled prescription.
    pub fn remove_prescription(&self, prescription_id: String) -> Result<(), ClinicError> {
        let db = self.db.lock()?;
        Registrar::new(&db).remove_prescription(&prescription_id)?;
        Ok(())
    }

    // =========================================================================
    // Pharmacy Operations
    // =========================================================================

    /// Dispense a prescription and derive its invoice, atomically.
    pub fn dispense_prescription(
        &self,
        prescription_id: String,
        pharmacist_id: String,
        lines: Vec<FfiDispenseLine>,
        consultation_fee: Option<String>,
    ) -> Result<FfiFulfillment, ClinicError> {
        let consultation_fee = parse_fee(consultation_fee.as_deref())?;
        let lines = lines
            .into_iter()
            .map(|line| {
                Ok(DispenseLine {
                    prescription_item_id: line.prescription_item_id,
                    drug_code: line.drug_code,
                    quantity: line.quantity,
                    unit_price: parse_money("unit_price", &line.unit_price)?,
                    notes: line.notes,
                })
            })
            .collect::<Result<Vec<_>, ClinicError>>()?;

        let db = self.db.lock()?;
        let request = DispenseRequest {
            prescription_id,
            pharmacist_id,
            lines,
        };
        let outcome = PharmacyService::new(&db).fulfill_prescription(&request, consultation_fee)?;

        let items = db.get_prescription_items(&outcome.dispensing.prescription.prescription_id)?;
        Ok(FfiFulfillment {
            dispensing_number: outcome.dispensing.dispensing_number,
            lines: outcome.dispensing.lines.into_iter().map(|l| l.into()).collect(),
            prescription: prescription_to_ffi(outcome.dispensing.prescription, items),
            billing: outcome.billing.into(),
        })
    }

    /// List the dispensing ledger for a prescription.
    pub fn list_dispensings_for_prescription(
        &self,
        prescription_id: String,
    ) -> Result<Vec<FfiDispensing>, ClinicError> {
        let db = self.db.lock()?;
        let rows = db.list_dispensings_for_prescription(&prescription_id)?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    // =========================================================================
    // Billing Operations
    // =========================================================================

    /// Derive the invoice for a prescription. Idempotent.
    pub fn generate_billing(
        &self,
        prescription_id: String,
        consultation_fee: Option<String>,
    ) -> Result<FfiBilling, ClinicError> {
        let consultation_fee = parse_fee(consultation_fee.as_deref())?;
        let db = self.db.lock()?;
        let billing =
            PharmacyService::new(&db).generate_billing(&prescription_id, consultation_fee)?;
        Ok(billing.into())
    }

    /// Record a payment against an invoice.
    pub fn record_payment(
        &self,
        billing_id: String,
        amount: String,
    ) -> Result<FfiBilling, ClinicError> {
        let amount = parse_money("amount", &amount)?;
        let db = self.db.lock()?;
        let billing = PharmacyService::new(&db).record_payment(&billing_id, amount)?;
        Ok(billing.into())
    }

    /// Get the invoice for a prescription, if one has been generated.
    pub fn get_billing_for_prescription(
        &self,
        prescription_id: String,
    ) -> Result<Option<FfiBilling>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db
            .find_billing_for_prescription(&prescription_id)?
            .map(|b| b.into()))
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export all invoices as JSON.
    pub fn export_invoices_json(&self) -> Result<String, ClinicError> {
        let db = self.db.lock()?;
        let batch = export::InvoiceExporter::new(&db).export_all()?;
        Ok(batch.to_json()?)
    }

    /// Export all invoices as CSV.
    pub fn export_invoices_csv(&self) -> Result<String, ClinicError> {
        let db = self.db.lock()?;
        let batch = export::InvoiceExporter::new(&db).export_all()?;
        Ok(batch.to_csv())
    }

    /// Export invoices issued at or after `since` (RFC 3339) as JSON.
    pub fn export_invoices_since_json(&self, since: String) -> Result<String, ClinicError> {
        let db = self.db.lock()?;
        let batch = export::InvoiceExporter::new(&db).export_since(&since)?;
        Ok(batch.to_json()?)
    }

    /// Export invoices issued at or after `since` (RFC 3339) as CSV.
    pub fn export_invoices_since_csv(&self, since: String) -> Result<String, ClinicError> {
        let db = self.db.lock()?;
        let batch = export::InvoiceExporter::new(&db).export_since(&since)?;
        Ok(batch.to_csv())
    }
}

impl ClinicCore {
    fn transition(
        &self,
        prescription_id: String,
        op: impl Fn(&Registrar<'_>, &str) -> records::RecordsResult<Prescription>,
    ) -> Result<FfiPrescription, ClinicError> {
        let db = self.db.lock()?;
        let registrar = Registrar::new(&db);
        let prescription = op(&registrar, &prescription_id)?;
        let items = db.get_prescription_items(&prescription.prescription_id)?;
        Ok(prescription_to_ffi(prescription, items))
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub patient_id: String,
    pub clinic_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            patient_id: patient.patient_id,
            clinic_number: patient.clinic_number,
            first_name: patient.first_name,
            last_name: patient.last_name,
            date_of_birth: patient.date_of_birth,
            phone: patient.phone,
            address: patient.address,
            notes: patient.notes,
        }
    }
}

/// FFI-safe staff member.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStaff {
    pub staff_id: String,
    pub employee_number: String,
    pub full_name: String,
    pub role: String,
}

impl From<Staff> for FfiStaff {
    fn from(staff: Staff) -> Self {
        Self {
            staff_id: staff.staff_id,
            employee_number: staff.employee_number,
            full_name: staff.full_name,
            role: staff.role.as_str().to_string(),
        }
    }
}

/// FFI-safe drug.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDrug {
    pub code: String,
    pub name: String,
    pub generic_name: Option<String>,
    pub category: Option<String>,
    pub unit: String,
    pub unit_price: String,
    pub quantity_in_stock: i64,
    pub reorder_level: i64,
    pub low_stock: bool,
}

impl From<Drug> for FfiDrug {
    fn from(drug: Drug) -> Self {
        let low_stock = drug.is_low_stock();
        Self {
            code: drug.code,
            name: drug.name,
            generic_name: drug.generic_name,
            category: drug.category,
            unit: drug.unit,
            unit_price: drug.unit_price.to_string(),
            quantity_in_stock: drug.quantity_in_stock,
            reorder_level: drug.reorder_level,
            low_stock,
        }
    }
}

impl TryFrom<FfiDrug> for Drug {
    type Error = ClinicError;

    fn try_from(drug: FfiDrug) -> Result<Self, Self::Error> {
        if drug.quantity_in_stock < 0 {
            return Err(ClinicError::ValidationError(
                "quantity_in_stock cannot be negative".into(),
            ));
        }
        let mut model = Drug::new(drug.code, drug.name);
        model.generic_name = drug.generic_name;
        model.category = drug.category;
        model.unit = drug.unit;
        model.unit_price = parse_money("unit_price", &drug.unit_price)?;
        model.quantity_in_stock = drug.quantity_in_stock;
        model.reorder_level = drug.reorder_level;
        Ok(model)
    }
}

/// FFI-safe visit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisit {
    pub visit_id: String,
    pub visit_number: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub reason: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub status: String,
}

impl From<Visit> for FfiVisit {
    fn from(visit: Visit) -> Self {
        Self {
            visit_id: visit.visit_id,
            visit_number: visit.visit_number,
            patient_id: visit.patient_id,
            doctor_id: visit.doctor_id,
            reason: visit.reason,
            diagnosis: visit.diagnosis,
            notes: visit.notes,
            status: visit.status.as_str().to_string(),
        }
    }
}

/// FFI-safe prescription item.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescriptionItem {
    pub id: i64,
    pub drug_code: String,
    pub quantity: i64,
    pub quantity_dispensed: Option<i64>,
    pub unit_price: String,
    pub dosage: Option<String>,
}

impl From<PrescriptionItem> for FfiPrescriptionItem {
    fn from(item: PrescriptionItem) -> Self {
        Self {
            id: item.id,
            drug_code: item.drug_code,
            quantity: item.quantity,
            quantity_dispensed: item.quantity_dispensed,
            unit_price: item.unit_price.to_string(),
            dosage: item.dosage,
        }
    }
}

/// FFI-safe prescription with its items.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescription {
    pub prescription_id: String,
    pub prescription_number: String,
    pub patient_id: String,
    pub visit_id: Option<String>,
    pub doctor_id: String,
    pub notes: Option<String>,
    pub status: String,
    pub sent_to_pharmacy_at: Option<String>,
    pub dispensed_at: Option<String>,
    pub dispensed_by: Option<String>,
    pub items: Vec<FfiPrescriptionItem>,
}

fn prescription_to_ffi(
    prescription: Prescription,
    items: Vec<PrescriptionItem>,
) -> FfiPrescription {
    FfiPrescription {
        prescription_id: prescription.prescription_id,
        prescription_number: prescription.prescription_number,
        patient_id: prescription.patient_id,
        visit_id: prescription.visit_id,
        doctor_id: prescription.doctor_id,
        notes: prescription.notes,
        status: prescription.status.as_str().to_string(),
        sent_to_pharmacy_at: prescription.sent_to_pharmacy_at,
        dispensed_at: prescription.dispensed_at,
        dispensed_by: prescription.dispensed_by,
        items: items.into_iter().map(|item| item.into()).collect(),
    }
}

/// FFI-safe new prescription item.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPrescriptionItem {
    pub drug_code: String,
    pub quantity: i64,
    pub dosage: Option<String>,
}

/// FFI-safe dispense request line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDispenseLine {
    /// Prescription item row id; 0 for an ad-hoc line
    pub prescription_item_id: i64,
    pub drug_code: String,
    pub quantity: i64,
    pub unit_price: String,
    pub notes: Option<String>,
}

/// FFI-safe dispensing ledger row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDispensing {
    pub id: i64,
    pub dispensing_number: String,
    pub prescription_id: String,
    pub prescription_item_id: Option<i64>,
    pub drug_code: String,
    pub quantity: i64,
    pub unit_price: String,
    pub stock_before: i64,
    pub stock_after: i64,
    pub pharmacist_id: String,
    pub notes: Option<String>,
    pub created_at: String,
}

impl From<Dispensing> for FfiDispensing {
    fn from(row: Dispensing) -> Self {
        Self {
            id: row.id,
            dispensing_number: row.dispensing_number,
            prescription_id: row.prescription_id,
            prescription_item_id: row.prescription_item_id,
            drug_code: row.drug_code,
            quantity: row.quantity,
            unit_price: row.unit_price.to_string(),
            stock_before: row.stock_before,
            stock_after: row.stock_after,
            pharmacist_id: row.pharmacist_id,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

/// FFI-safe stock adjustment ledger row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStockAdjustment {
    pub id: i64,
    pub drug_code: String,
    pub delta: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub staff_id: String,
    pub reason: Option<String>,
    pub created_at: String,
}

impl From<StockAdjustment> for FfiStockAdjustment {
    fn from(row: StockAdjustment) -> Self {
        Self {
            id: row.id,
            drug_code: row.drug_code,
            delta: row.delta,
            stock_before: row.stock_before,
            stock_after: row.stock_after,
            staff_id: row.staff_id,
            reason: row.reason,
            created_at: row.created_at,
        }
    }
}

/// FFI-safe billing.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBilling {
    pub billing_id: String,
    pub invoice_number: String,
    pub prescription_id: String,
    pub patient_id: String,
    pub consultation_fee: String,
    pub medication_cost: String,
    pub total_amount: String,
    pub amount_paid: String,
    pub payment_status: String,
}

impl From<Billing> for FfiBilling {
    fn from(billing: Billing) -> Self {
        Self {
            billing_id: billing.billing_id,
            invoice_number: billing.invoice_number,
            prescription_id: billing.prescription_id,
            patient_id: billing.patient_id,
            consultation_fee: billing.consultation_fee.to_string(),
            medication_cost: billing.medication_cost.to_string(),
            total_amount: billing.total_amount.to_string(),
            amount_paid: billing.amount_paid.to_string(),
            payment_status: billing.payment_status.as_str().to_string(),
        }
    }
}

/// FFI-safe fulfillment result: the dispensing outcome plus the invoice.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFulfillment {
    pub dispensing_number: String,
    pub lines: Vec<FfiDispensing>,
    pub prescription: FfiPrescription,
    pub billing: FfiBilling,
}
