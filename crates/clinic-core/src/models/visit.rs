//! Visit/consultation models.

use serde::{Deserialize, Serialize};

/// Visit status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VisitStatus {
    /// Booked, not yet seen
    Scheduled,
    /// Consultation finished
    Completed,
    /// Called off before consultation
    Cancelled,
}

impl VisitStatus {
    /// Stable storage/FFI string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Scheduled => "scheduled",
            VisitStatus::Completed => "completed",
            VisitStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a storage/FFI string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(VisitStatus::Scheduled),
            "completed" => Some(VisitStatus::Completed),
            "cancelled" => Some(VisitStatus::Cancelled),
            _ => None,
        }
    }
}

/// A patient visit/consultation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    /// Surrogate UUID, primary key
    pub visit_id: String,
    /// Human-readable visit number (VST-YYYYMMDD-NNNN)
    pub visit_number: String,
    /// Patient being seen
    pub patient_id: String,
    /// Attending doctor (staff id)
    pub doctor_id: String,
    /// Presenting complaint / reason for visit
    pub reason: Option<String>,
    /// Diagnosis recorded by the doctor
    pub diagnosis: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Status
    pub status: VisitStatus,
    /// Tombstone flag; excluded from standard reads
    pub deleted: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Visit {
    /// Create a new scheduled visit with a pre-generated visit number.
    pub fn new(visit_number: String, patient_id: String, doctor_id: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            visit_id: uuid::Uuid::new_v4().to_string(),
            visit_number,
            patient_id,
            doctor_id,
            reason: None,
            diagnosis: None,
            notes: None,
            status: VisitStatus::Scheduled,
            deleted: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
