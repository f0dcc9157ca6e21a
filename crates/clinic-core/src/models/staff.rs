//! Staff models.

use serde::{Deserialize, Serialize};

/// Staff role within the clinic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StaffRole {
    Doctor,
    Pharmacist,
    Nurse,
    Receptionist,
    Admin,
}

impl StaffRole {
    /// Stable storage/FFI string for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Doctor => "doctor",
            StaffRole::Pharmacist => "pharmacist",
            StaffRole::Nurse => "nurse",
            StaffRole::Receptionist => "receptionist",
            StaffRole::Admin => "admin",
        }
    }

    /// Parse a storage/FFI string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "doctor" => Some(StaffRole::Doctor),
            "pharmacist" => Some(StaffRole::Pharmacist),
            "nurse" => Some(StaffRole::Nurse),
            "receptionist" => Some(StaffRole::Receptionist),
            "admin" => Some(StaffRole::Admin),
            _ => None,
        }
    }
}

/// A staff member. The identity layer maps logged-in accounts to `staff_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Staff {
    /// Surrogate UUID, primary key
    pub staff_id: String,
    /// Human-readable employee number (EMP-NNNN), generated once, year-independent
    pub employee_number: String,
    /// Full name
    pub full_name: String,
    /// Role
    pub role: StaffRole,
    /// Tombstone flag; excluded from standard reads
    pub deleted: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Staff {
    /// Create a new staff member with a pre-generated employee number.
    pub fn new(employee_number: String, full_name: String, role: StaffRole) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            staff_id: uuid::Uuid::new_v4().to_string(),
            employee_number,
            full_name,
            role,
            deleted: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [
            StaffRole::Doctor,
            StaffRole::Pharmacist,
            StaffRole::Nurse,
            StaffRole::Receptionist,
            StaffRole::Admin,
        ] {
            assert_eq!(StaffRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(StaffRole::parse("janitor"), None);
    }

    #[test]
    fn test_new_staff() {
        let staff = Staff::new("EMP-0001".into(), "Amina Okafor".into(), StaffRole::Pharmacist);
        assert_eq!(staff.employee_number, "EMP-0001");
        assert_eq!(staff.role, StaffRole::Pharmacist);
    }
}
