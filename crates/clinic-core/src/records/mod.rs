//! Front-desk record keeping: registration, visits, prescription writing.
//!
//! Every operation that mints a human-readable identifier runs inside
//! `Database::run_in_transaction`, so a lost identifier race (UNIQUE
//! conflict) re-runs the operation and picks up a fresh number.

use thiserror::Error;

use crate::db::{Database, DbError, TransientError};
use crate::models::{
    Patient, Prescription, PrescriptionItem, PrescriptionStatus, Staff, StaffRole, Visit,
    VisitStatus,
};
use crate::sequence::{SequenceFamily, SequenceGenerator};

/// Record-keeping errors.
#[derive(Error, Debug)]
pub enum RecordsError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type RecordsResult<T> = Result<T, RecordsError>;

impl TransientError for RecordsError {
    fn is_transient(&self) -> bool {
        match self {
            RecordsError::Database(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Fields for registering a patient.
#[derive(Debug, Clone, Default)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// One line of a new prescription. The unit price is not supplied: it is
/// frozen from the drug catalog at write time.
#[derive(Debug, Clone)]
pub struct NewPrescriptionItem {
    pub drug_code: String,
    pub quantity: i64,
    pub dosage: Option<String>,
}

/// Assigns numbers and files records: patients, staff, visits,
/// prescriptions.
pub struct Registrar<'a> {
    db: &'a Database,
}

impl<'a> Registrar<'a> {
    /// Create a new registrar.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register a patient, assigning the next clinic number.
    pub fn register_patient(&self, new: &NewPatient) -> RecordsResult<Patient> {
        if new.first_name.trim().is_empty() || new.last_name.trim().is_empty() {
            return Err(RecordsError::Validation(
                "patient first and last name are required".into(),
            ));
        }
        self.db.run_in_transaction(|db| {
            let clinic_number = SequenceGenerator::new(db).next(SequenceFamily::ClinicNumber)?;
            let mut patient = Patient::new(
                clinic_number,
                new.first_name.trim().to_string(),
                new.last_name.trim().to_string(),
            );
            patient.date_of_birth = new.date_of_birth.clone();
            patient.phone = new.phone.clone();
            patient.address = new.address.clone();
            patient.notes = new.notes.clone();
            db.insert_patient(&patient)?;
            Ok(patient)
        })
    }

    /// Add a staff member, assigning the next employee number.
    pub fn add_staff(&self, full_name: &str, role: StaffRole) -> RecordsResult<Staff> {
        if full_name.trim().is_empty() {
            return Err(RecordsError::Validation("staff name is required".into()));
        }
        self.db.run_in_transaction(|db| {
            let employee_number =
                SequenceGenerator::new(db).next(SequenceFamily::EmployeeNumber)?;
            let staff = Staff::new(employee_number, full_name.trim().to_string(), role);
            db.insert_staff(&staff)?;
            Ok(staff)
        })
    }

    /// Record a visit, assigning the next visit number.
    pub fn record_visit(
        &self,
        patient_id: &str,
        doctor_id: &str,
        reason: Option<String>,
    ) -> RecordsResult<Visit> {
        self.db.run_in_transaction(|db| {
            db.get_patient(patient_id)?
                .ok_or_else(|| RecordsError::NotFound(format!("patient {}", patient_id)))?;
            let doctor = db
                .get_staff(doctor_id)?
                .ok_or_else(|| RecordsError::NotFound(format!("staff {}", doctor_id)))?;
            if doctor.role != StaffRole::Doctor {
                return Err(RecordsError::InvalidState(format!(
                    "staff {} is not a doctor",
                    doctor.employee_number
                )));
            }

            let visit_number = SequenceGenerator::new(db).next(SequenceFamily::VisitNumber)?;
            let mut visit = Visit::new(visit_number, patient_id.to_string(), doctor_id.to_string());
            visit.reason = reason.clone();
            db.insert_visit(&visit)?;
            Ok(visit)
        })
    }

    /// Complete a scheduled visit with the doctor's findings.
    pub fn complete_visit(
        &self,
        visit_id: &str,
        diagnosis: Option<String>,
        notes: Option<String>,
    ) -> RecordsResult<Visit> {
        let mut visit = self
            .db
            .get_visit(visit_id)?
            .ok_or_else(|| RecordsError::NotFound(format!("visit {}", visit_id)))?;
        if visit.status != VisitStatus::Scheduled {
            return Err(RecordsError::InvalidState(format!(
                "visit {} is {}, not scheduled",
                visit.visit_number,
                visit.status.as_str()
            )));
        }
        visit.status = VisitStatus::Completed;
        visit.diagnosis = diagnosis;
        visit.notes = notes;
        self.db.update_visit(&visit)?;
        Ok(visit)
    }

    /// Cancel a scheduled visit.
    pub fn cancel_visit(&self, visit_id: &str) -> RecordsResult<Visit> {
        let mut visit = self
            .db
            .get_visit(visit_id)?
            .ok_or_else(|| RecordsError::NotFound(format!("visit {}", visit_id)))?;
        if visit.status != VisitStatus::Scheduled {
            return Err(RecordsError::InvalidState(format!(
                "visit {} is {}, not scheduled",
                visit.visit_number,
                visit.status.as_str()
            )));
        }
        visit.status = VisitStatus::Cancelled;
        self.db.update_visit(&visit)?;
        Ok(visit)
    }

    /// Write a prescription, assigning the next prescription number and
    /// freezing each item's unit price from the drug catalog.
    pub fn create_prescription(
        &self,
        patient_id: &str,
        doctor_id: &str,
        visit_id: Option<&str>,
        items: &[NewPrescriptionItem],
        notes: Option<String>,
    ) -> RecordsResult<(Prescription, Vec<PrescriptionItem>)> {
        if items.is_empty() {
            return Err(RecordsError::Validation(
                "a prescription needs at least one item".into(),
            ));
        }
        if let Some(bad) = items.iter().find(|item| item.quantity <= 0) {
            return Err(RecordsError::Validation(format!(
                "prescribed quantity for {} must be positive",
                bad.drug_code
            )));
        }

        self.db.run_in_transaction(|db| {
            db.get_patient(patient_id)?
                .ok_or_else(|| RecordsError::NotFound(format!("patient {}", patient_id)))?;
            db.get_staff(doctor_id)?
                .ok_or_else(|| RecordsError::NotFound(format!("staff {}", doctor_id)))?;
            if let Some(visit_id) = visit_id {
                db.get_visit(visit_id)?
                    .ok_or_else(|| RecordsError::NotFound(format!("visit {}", visit_id)))?;
            }

            let mut prescription_items = Vec::with_capacity(items.len());
            for item in items {
                let drug = db.get_drug(&item.drug_code)?.ok_or_else(|| {
                    RecordsError::NotFound(format!("drug {}", item.drug_code))
                })?;
                prescription_items.push(PrescriptionItem {
                    id: 0,
                    prescription_id: String::new(),
                    drug_code: drug.code,
                    quantity: item.quantity,
                    quantity_dispensed: None,
                    unit_price: drug.unit_price,
                    dosage: item.dosage.clone(),
                });
            }

            let number = SequenceGenerator::new(db).next(SequenceFamily::PrescriptionNumber)?;
            let mut prescription =
                Prescription::new(number, patient_id.to_string(), doctor_id.to_string());
            prescription.visit_id = visit_id.map(String::from);
            prescription.notes = notes.clone();

            let saved_items = db.insert_prescription(&prescription, &prescription_items)?;
            Ok((prescription, saved_items))
        })
    }

    /// Hand a draft prescription to the pharmacy queue.
    pub fn send_to_pharmacy(&self, prescription_id: &str) -> RecordsResult<Prescription> {
        self.transition(prescription_id, PrescriptionStatus::SentToPharmacy)
    }

    /// Mark a queued prescription as being prepared.
    pub fn mark_processing(&self, prescription_id: &str) -> RecordsResult<Prescription> {
        self.transition(prescription_id, PrescriptionStatus::Processing)
    }

    /// Mark a prescription as waiting at the pickup counter.
    pub fn mark_ready_for_pickup(&self, prescription_id: &str) -> RecordsResult<Prescription> {
        self.transition(prescription_id, PrescriptionStatus::ReadyForPickup)
    }

    /// Cancel a prescription that has not been dispensed.
    pub fn cancel_prescription(&self, prescription_id: &str) -> RecordsResult<Prescription> {
        self.transition(prescription_id, PrescriptionStatus::Cancelled)
    }

    fn transition(
        &self,
        prescription_id: &str,
        target: PrescriptionStatus,
    ) -> RecordsResult<Prescription> {
        let prescription = self
            .db
            .get_prescription(prescription_id)?
            .ok_or_else(|| RecordsError::NotFound(format!("prescription {}", prescription_id)))?;

        if !prescription.status.can_transition_to(target) {
            return Err(RecordsError::InvalidState(format!(
                "prescription {} cannot move from {} to {}",
                prescription.prescription_number,
                prescription.status.as_str(),
                target.as_str()
            )));
        }

        self.db.update_prescription_status(prescription_id, target)?;
        self.db
            .get_prescription(prescription_id)?
            .ok_or_else(|| RecordsError::NotFound(format!("prescription {}", prescription_id)))
    }

    /// Soft-delete a patient.
    pub fn remove_patient(&self, patient_id: &str) -> RecordsResult<()> {
        if !self.db.soft_delete_patient(patient_id)? {
            return Err(RecordsError::NotFound(format!("patient {}", patient_id)));
        }
        Ok(())
    }

    /// Soft-delete a staff member.
    pub fn remove_staff(&self, staff_id: &str) -> RecordsResult<()> {
        if !self.db.soft_delete_staff(staff_id)? {
            return Err(RecordsError::NotFound(format!("staff {}", staff_id)));
        }
        Ok(())
    }

    /// Soft-delete a prescription. Only drafts and cancelled prescriptions
    /// can be removed; a dispensed one is part of the ledger's history.
    pub fn remove_prescription(&self, prescription_id: &str) -> RecordsResult<()> {
        let prescription = self
            .db
            .get_prescription(prescription_id)?
            .ok_or_else(|| RecordsError::NotFound(format!("prescription {}", prescription_id)))?;
        if !matches!(
            prescription.status,
            PrescriptionStatus::Draft | PrescriptionStatus::Cancelled
        ) {
            return Err(RecordsError::InvalidState(format!(
                "prescription {} is {} and cannot be removed",
                prescription.prescription_number,
                prescription.status.as_str()
            )));
        }
        self.db.soft_delete_prescription(prescription_id)?;
        Ok(())
    }
}
