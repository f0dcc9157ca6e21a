//! Dispensing and stock-adjustment ledger models.
//!
//! Both types are append-only audit rows: they are written once by the
//! workflow that mutates stock and never updated or deleted afterwards.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One dispensed line, recording the stock movement it caused.
///
/// All rows written by a single dispensing-workflow call share one
/// `dispensing_number`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dispensing {
    /// Row id; 0 until persisted
    pub id: i64,
    /// Shared per-call dispensing number (DSP-YYYYMMDD-NNNN)
    pub dispensing_number: String,
    /// Prescription being fulfilled
    pub prescription_id: String,
    /// Matching prescription item; None for ad-hoc lines
    pub prescription_item_id: Option<i64>,
    /// Drug dispensed
    pub drug_code: String,
    /// Quantity handed over
    pub quantity: i64,
    /// Unit price charged for this line
    pub unit_price: Decimal,
    /// Stock on hand before the deduction
    pub stock_before: i64,
    /// Stock on hand after the deduction
    pub stock_after: i64,
    /// Acting pharmacist (staff id)
    pub pharmacist_id: String,
    /// Free-form notes for this line
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

/// A manual stock adjustment outside the dispensing workflow
/// (receiving deliveries, stock-takes, write-offs).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockAdjustment {
    /// Row id; 0 until persisted
    pub id: i64,
    /// Drug adjusted
    pub drug_code: String,
    /// Signed change applied to stock
    pub delta: i64,
    /// Stock on hand before the adjustment
    pub stock_before: i64,
    /// Stock on hand after the adjustment
    pub stock_after: i64,
    /// Acting staff member
    pub staff_id: String,
    /// Why the adjustment was made
    pub reason: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispensing_stock_delta_consistency() {
        let row = Dispensing {
            id: 1,
            dispensing_number: "DSP-20240115-0001".into(),
            prescription_id: "rx-1".into(),
            prescription_item_id: Some(3),
            drug_code: "PARA-500".into(),
            quantity: 5,
            unit_price: Decimal::new(150, 2),
            stock_before: 10,
            stock_after: 5,
            pharmacist_id: "s-1".into(),
            notes: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        assert_eq!(row.stock_before - row.quantity, row.stock_after);
    }
}
