//! Sequence generator property tests.

use proptest::prelude::*;

use clinic_core::db::Database;
use clinic_core::models::Patient;
use clinic_core::sequence::{next_in_sequence, SequenceFamily, SequenceGenerator};

#[test]
fn test_fresh_prefix_starts_at_one() {
    for (family, expected) in [
        (SequenceFamily::ClinicNumber, "CLN-2024-00001"),
        (SequenceFamily::VisitNumber, "VST-20240115-0001"),
        (SequenceFamily::PrescriptionNumber, "RX-20240115-0001"),
        (SequenceFamily::DispensingNumber, "DSP-20240115-0001"),
        (SequenceFamily::InvoiceNumber, "INV-20240115-0001"),
        (SequenceFamily::EmployeeNumber, "EMP-0001"),
    ] {
        let db = Database::open_in_memory().unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            SequenceGenerator::new(&db).next_for_date(family, date).unwrap(),
            expected
        );
    }
}

#[test]
fn test_next_is_insertion_order_independent() {
    let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let orders: [&[u32]; 3] = [&[1, 2, 3, 4], &[4, 3, 2, 1], &[2, 4, 1, 3]];

    for order in orders {
        let db = Database::open_in_memory().unwrap();
        for n in order {
            db.insert_patient(&Patient::new(
                format!("CLN-2024-{:05}", n),
                "A".into(),
                format!("B{}", n),
            ))
            .unwrap();
        }
        assert_eq!(
            SequenceGenerator::new(&db)
                .next_for_date(SequenceFamily::ClinicNumber, date)
                .unwrap(),
            "CLN-2024-00005"
        );
    }
}

#[test]
fn test_malformed_suffix_restarts_counter() {
    let db = Database::open_in_memory().unwrap();
    let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

    // A hand-entered, non-numeric clinic number; lexicographically greatest
    db.insert_patient(&Patient::new("CLN-2024-LEGACY".into(), "A".into(), "B".into()))
        .unwrap();

    assert_eq!(
        SequenceGenerator::new(&db)
            .next_for_date(SequenceFamily::ClinicNumber, date)
            .unwrap(),
        "CLN-2024-00001"
    );
}

proptest! {
    /// With no existing identifier, every prefix starts at zero-padded 1.
    #[test]
    fn prop_empty_prefix_starts_at_one(prefix in "[A-Z]{2,4}-", width in 3usize..6) {
        let id = next_in_sequence(&prefix, width, None);
        prop_assert_eq!(id, format!("{}{:0width$}", prefix, 1, width = width));
    }

    /// The successor of max N is N+1, zero-padded to the family width.
    #[test]
    fn prop_successor_of_max(n in 1u64..99_999, width in 4usize..6) {
        let prefix = "INV-20240115-";
        let current = format!("{}{:0width$}", prefix, n, width = width);
        let next = next_in_sequence(prefix, width, Some(&current));
        prop_assert_eq!(next, format!("{}{:0width$}", prefix, n + 1, width = width));
    }

    /// Any unparseable suffix restarts the counter instead of erroring.
    #[test]
    fn prop_unparseable_suffix_restarts(suffix in "[A-Za-z ]{1,8}") {
        let prefix = "DSP-20240115-";
        let current = format!("{}{}", prefix, suffix);
        let next = next_in_sequence(prefix, 4, Some(&current));
        prop_assert_eq!(next, "DSP-20240115-0001");
    }

    /// Generated identifiers always carry the prefix and at least the
    /// configured counter width.
    #[test]
    fn prop_output_shape(n in proptest::option::of(1u64..1_000_000), width in 3usize..6) {
        let prefix = "RX-20240115-";
        let current = n.map(|n| format!("{}{}", prefix, n));
        let next = next_in_sequence(prefix, width, current.as_deref());
        prop_assert!(next.starts_with(prefix));
        let suffix = &next[prefix.len()..];
        prop_assert!(suffix.len() >= width);
        prop_assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }
}
