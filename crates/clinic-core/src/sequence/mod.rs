//! Human-readable identifier sequences.
//!
//! Every identifier-bearing entity draws its number from a prefixed,
//! zero-padded numeric sequence: `CLN-2024-00001`, `RX-20240115-0001`,
//! `EMP-0001`. Generation is optimistic, not reserved: the next number is
//! computed from the greatest one already stored (tombstones included), and
//! two concurrent callers can be handed the same candidate. The UNIQUE
//! constraint on the identifier column rejects the loser at commit; the
//! transactional retry loop re-runs the operation and picks up a fresh
//! number.

use chrono::NaiveDate;

use crate::db::{Database, DbResult};

/// The identifier families the clinic issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFamily {
    /// `CLN-YYYY-NNNNN`, year-scoped
    ClinicNumber,
    /// `EMP-NNNN`, one global sequence
    EmployeeNumber,
    /// `VST-YYYYMMDD-NNNN`, day-scoped
    VisitNumber,
    /// `RX-YYYYMMDD-NNNN`, day-scoped
    PrescriptionNumber,
    /// `DSP-YYYYMMDD-NNNN`, day-scoped
    DispensingNumber,
    /// `INV-YYYYMMDD-NNNN`, day-scoped
    InvoiceNumber,
}

impl SequenceFamily {
    /// The prefix for identifiers issued on `date`.
    pub fn prefix(&self, date: NaiveDate) -> String {
        match self {
            SequenceFamily::ClinicNumber => format!("CLN-{}-", date.format("%Y")),
            SequenceFamily::EmployeeNumber => "EMP-".to_string(),
            SequenceFamily::VisitNumber => format!("VST-{}-", date.format("%Y%m%d")),
            SequenceFamily::PrescriptionNumber => format!("RX-{}-", date.format("%Y%m%d")),
            SequenceFamily::DispensingNumber => format!("DSP-{}-", date.format("%Y%m%d")),
            SequenceFamily::InvoiceNumber => format!("INV-{}-", date.format("%Y%m%d")),
        }
    }

    /// Fixed zero-padding width of the trailing counter.
    pub const fn counter_width(&self) -> usize {
        match self {
            SequenceFamily::ClinicNumber => 5,
            _ => 4,
        }
    }
}

/// Compute the identifier after `current_max` under `prefix`.
///
/// A missing maximum starts the counter at 1. So does a maximum whose
/// suffix does not parse as an integer: malformed identifiers restart the
/// sequence rather than erroring, and the UNIQUE constraint catches any
/// collision that policy produces.
pub fn next_in_sequence(prefix: &str, width: usize, current_max: Option<&str>) -> String {
    let next = current_max
        .and_then(|id| id.strip_prefix(prefix))
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .map_or(1, |n| n + 1);
    format!("{}{:0width$}", prefix, next, width = width)
}

/// Issues the next identifier of a family from stored state.
pub struct SequenceGenerator<'a> {
    db: &'a Database,
}

impl<'a> SequenceGenerator<'a> {
    /// Create a new generator.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Next identifier for `family`, scoped to today.
    pub fn next(&self, family: SequenceFamily) -> DbResult<String> {
        self.next_for_date(family, chrono::Utc::now().date_naive())
    }

    /// Next identifier for `family`, scoped to `date`.
    pub fn next_for_date(&self, family: SequenceFamily, date: NaiveDate) -> DbResult<String> {
        let prefix = family.prefix(date);
        let current_max = self.db.max_identifier(family, &prefix)?;
        Ok(next_in_sequence(
            &prefix,
            family.counter_width(),
            current_max.as_deref(),
        ))
    }
}
