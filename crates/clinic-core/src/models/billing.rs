//! Billing/invoice models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payment status, derived from `amount_paid` against `total_amount`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Nothing paid yet
    Pending,
    /// Some, but not all, of the total paid
    PartiallyPaid,
    /// Paid in full
    Paid,
}

impl PaymentStatus {
    /// Stable storage/FFI string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::PartiallyPaid => "partially_paid",
            PaymentStatus::Paid => "paid",
        }
    }

    /// Parse a storage/FFI string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "partially_paid" => Some(PaymentStatus::PartiallyPaid),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }

    /// Derive the status from amounts. `amount_paid <= total_amount` is
    /// expected but not enforced here; overpayment still reads as Paid.
    pub fn derive(amount_paid: Decimal, total_amount: Decimal) -> Self {
        if amount_paid <= Decimal::ZERO {
            PaymentStatus::Pending
        } else if amount_paid < total_amount {
            PaymentStatus::PartiallyPaid
        } else {
            PaymentStatus::Paid
        }
    }
}

/// An invoice derived from a prescription. At most one per prescription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Billing {
    /// Surrogate UUID, primary key
    pub billing_id: String,
    /// Human-readable invoice number (INV-YYYYMMDD-NNNN)
    pub invoice_number: String,
    /// Prescription this invoice bills; unique per prescription
    pub prescription_id: String,
    /// Patient being billed
    pub patient_id: String,
    /// Consultation fee added on top of medication cost
    pub consultation_fee: Decimal,
    /// Sum of billable quantity × frozen unit price over all items
    pub medication_cost: Decimal,
    /// consultation_fee + medication_cost
    pub total_amount: Decimal,
    /// Running total of recorded payments
    pub amount_paid: Decimal,
    /// Derived payment status
    pub payment_status: PaymentStatus,
    /// Tombstone flag; excluded from standard reads
    pub deleted: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Billing {
    /// Create a new pending invoice.
    pub fn new(
        invoice_number: String,
        prescription_id: String,
        patient_id: String,
        consultation_fee: Decimal,
        medication_cost: Decimal,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            billing_id: uuid::Uuid::new_v4().to_string(),
            invoice_number,
            prescription_id,
            patient_id,
            consultation_fee,
            medication_cost,
            total_amount: consultation_fee + medication_cost,
            amount_paid: Decimal::ZERO,
            payment_status: PaymentStatus::Pending,
            deleted: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Outstanding balance; negative when overpaid.
    pub fn balance(&self) -> Decimal {
        self.total_amount - self.amount_paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_new_billing_totals() {
        let billing = Billing::new(
            "INV-20240115-0001".into(),
            "rx-1".into(),
            "p-1".into(),
            dec("20"),
            dec("11.00"),
        );
        assert_eq!(billing.total_amount, dec("31.00"));
        assert_eq!(billing.payment_status, PaymentStatus::Pending);
        assert_eq!(billing.balance(), dec("31.00"));
    }

    #[test]
    fn test_payment_status_derivation() {
        let total = dec("31.00");
        assert_eq!(PaymentStatus::derive(dec("0"), total), PaymentStatus::Pending);
        assert_eq!(
            PaymentStatus::derive(dec("10.50"), total),
            PaymentStatus::PartiallyPaid
        );
        assert_eq!(PaymentStatus::derive(dec("31.00"), total), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::derive(dec("40.00"), total), PaymentStatus::Paid);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::PartiallyPaid,
            PaymentStatus::Paid,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
    }
}
