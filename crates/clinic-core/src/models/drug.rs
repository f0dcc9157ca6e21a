//! Drug catalog models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A drug in the pharmacy inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Drug {
    /// Unique drug code (e.g., "PARA-500")
    pub code: String,
    /// Brand/display name
    pub name: String,
    /// Generic name (e.g., "paracetamol")
    pub generic_name: Option<String>,
    /// Category (e.g., "analgesic", "antibiotic")
    pub category: Option<String>,
    /// Dispensing unit (e.g., "tablets", "mL")
    pub unit: String,
    /// Current list price per unit; frozen onto prescription items at write time
    pub unit_price: Decimal,
    /// Units currently on hand; never negative
    pub quantity_in_stock: i64,
    /// Threshold below-or-at which the drug is flagged for reorder
    pub reorder_level: i64,
    /// Tombstone flag; excluded from standard reads
    pub deleted: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Drug {
    /// Create a new drug with required fields.
    pub fn new(code: String, name: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            code,
            name,
            generic_name: None,
            category: None,
            unit: "unit".into(),
            unit_price: Decimal::ZERO,
            quantity_in_stock: 0,
            reorder_level: 0,
            deleted: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Whether stock has fallen to or below the reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.quantity_in_stock <= self.reorder_level
    }

    /// Whether the requested quantity can be dispensed from current stock.
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        quantity >= 0 && self.quantity_in_stock >= quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_drug_defaults() {
        let drug = Drug::new("PARA-500".into(), "Paracetamol 500mg".into());
        assert_eq!(drug.code, "PARA-500");
        assert_eq!(drug.quantity_in_stock, 0);
        assert!(!drug.deleted);
        assert_eq!(drug.unit_price, Decimal::ZERO);
    }

    #[test]
    fn test_low_stock_boundary() {
        let mut drug = Drug::new("PARA-500".into(), "Paracetamol 500mg".into());
        drug.reorder_level = 20;

        drug.quantity_in_stock = 10;
        assert!(drug.is_low_stock());

        drug.quantity_in_stock = 20;
        assert!(drug.is_low_stock());

        drug.quantity_in_stock = 21;
        assert!(!drug.is_low_stock());
    }

    #[test]
    fn test_has_stock_for() {
        let mut drug = Drug::new("PARA-500".into(), "Paracetamol 500mg".into());
        drug.quantity_in_stock = 5;
        drug.unit_price = Decimal::new(150, 2);

        assert!(drug.has_stock_for(5));
        assert!(!drug.has_stock_for(6));
        assert!(!drug.has_stock_for(-1));
    }
}
