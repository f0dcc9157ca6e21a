//! Patient models.

use serde::{Deserialize, Serialize};

/// A registered patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Surrogate UUID, primary key
    pub patient_id: String,
    /// Human-readable clinic number (CLN-YYYY-NNNNN), generated at registration
    pub clinic_number: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Date of birth (ISO date)
    pub date_of_birth: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Tombstone flag; excluded from standard reads
    pub deleted: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with a pre-generated clinic number.
    pub fn new(clinic_number: String, first_name: String, last_name: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            patient_id: uuid::Uuid::new_v4().to_string(),
            clinic_number,
            first_name,
            last_name,
            date_of_birth: None,
            phone: None,
            address: None,
            notes: None,
            deleted: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Display name, "Last, First".
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_patient() {
        let patient = Patient::new("CLN-2024-00001".into(), "Jane".into(), "Doe".into());
        assert_eq!(patient.clinic_number, "CLN-2024-00001");
        assert_eq!(patient.patient_id.len(), 36); // UUID format
        assert!(!patient.deleted);
    }

    #[test]
    fn test_display_name() {
        let patient = Patient::new("CLN-2024-00001".into(), "Jane".into(), "Doe".into());
        assert_eq!(patient.display_name(), "Doe, Jane");
    }
}
