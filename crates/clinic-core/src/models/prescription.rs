//! Prescription models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Prescription lifecycle status.
///
/// Ordered set: Draft → SentToPharmacy → Processing → ReadyForPickup →
/// Dispensed, with Cancelled reachable from any non-terminal status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PrescriptionStatus {
    /// Being written by the doctor
    Draft,
    /// Handed to the pharmacy queue
    SentToPharmacy,
    /// Pharmacy is preparing the items
    Processing,
    /// Prepared, waiting at the pickup counter
    ReadyForPickup,
    /// Stock deducted and handed over; terminal
    Dispensed,
    /// Called off; terminal
    Cancelled,
}

impl PrescriptionStatus {
    /// Stable storage/FFI string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Draft => "draft",
            PrescriptionStatus::SentToPharmacy => "sent_to_pharmacy",
            PrescriptionStatus::Processing => "processing",
            PrescriptionStatus::ReadyForPickup => "ready_for_pickup",
            PrescriptionStatus::Dispensed => "dispensed",
            PrescriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a storage/FFI string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PrescriptionStatus::Draft),
            "sent_to_pharmacy" => Some(PrescriptionStatus::SentToPharmacy),
            "processing" => Some(PrescriptionStatus::Processing),
            "ready_for_pickup" => Some(PrescriptionStatus::ReadyForPickup),
            "dispensed" => Some(PrescriptionStatus::Dispensed),
            "cancelled" => Some(PrescriptionStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether the dispensing workflow may run against this status.
    ///
    /// Dispensing transitions a prescription to Dispensed exactly once, and
    /// only from SentToPharmacy or Processing.
    pub fn can_dispense(&self) -> bool {
        matches!(
            self,
            PrescriptionStatus::SentToPharmacy | PrescriptionStatus::Processing
        )
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PrescriptionStatus::Dispensed | PrescriptionStatus::Cancelled
        )
    }

    /// Whether a manual transition to `next` is allowed.
    pub fn can_transition_to(&self, next: PrescriptionStatus) -> bool {
        use PrescriptionStatus::*;
        match (self, next) {
            (Draft, SentToPharmacy) => true,
            (SentToPharmacy, Processing) => true,
            (Processing, ReadyForPickup) => true,
            (Draft | SentToPharmacy | Processing | ReadyForPickup, Cancelled) => true,
            _ => false,
        }
    }
}

/// A prescription written by a doctor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    /// Surrogate UUID, primary key
    pub prescription_id: String,
    /// Human-readable prescription number (RX-YYYYMMDD-NNNN)
    pub prescription_number: String,
    /// Patient the prescription is for
    pub patient_id: String,
    /// Visit this prescription came out of, if any
    pub visit_id: Option<String>,
    /// Prescribing doctor (staff id)
    pub doctor_id: String,
    /// Free-form notes from the doctor
    pub notes: Option<String>,
    /// Lifecycle status
    pub status: PrescriptionStatus,
    /// When it was handed to the pharmacy queue
    pub sent_to_pharmacy_at: Option<String>,
    /// When the dispensing workflow completed
    pub dispensed_at: Option<String>,
    /// Pharmacist who dispensed (staff id)
    pub dispensed_by: Option<String>,
    /// Tombstone flag; excluded from standard reads
    pub deleted: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Prescription {
    /// Create a new draft prescription with a pre-generated number.
    pub fn new(prescription_number: String, patient_id: String, doctor_id: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            prescription_id: uuid::Uuid::new_v4().to_string(),
            prescription_number,
            patient_id,
            visit_id: None,
            doctor_id,
            notes: None,
            status: PrescriptionStatus::Draft,
            sent_to_pharmacy_at: None,
            dispensed_at: None,
            dispensed_by: None,
            deleted: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A single line on a prescription.
///
/// `unit_price` is captured from the drug at write time and stays frozen,
/// independent of later catalog price changes. `quantity_dispensed` is set
/// at most once, by the dispensing workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionItem {
    /// Row id; 0 until persisted
    pub id: i64,
    /// Owning prescription
    pub prescription_id: String,
    /// Drug code
    pub drug_code: String,
    /// Quantity prescribed
    pub quantity: i64,
    /// Quantity actually dispensed; None until dispensed
    pub quantity_dispensed: Option<i64>,
    /// Unit price frozen at prescription time
    pub unit_price: Decimal,
    /// Dosage instructions (e.g., "1 tablet twice daily after meals")
    pub dosage: Option<String>,
}

impl PrescriptionItem {
    /// The quantity billing should charge for: dispensed if known,
    /// prescribed otherwise.
    pub fn billable_quantity(&self) -> i64 {
        self.quantity_dispensed.unwrap_or(self.quantity)
    }

    /// Line cost at the frozen unit price.
    pub fn line_cost(&self) -> Decimal {
        self.unit_price * Decimal::from(self.billable_quantity())
    }
}
