//! Tests against the FFI facade, the surface presentation layers consume.

use clinic_core::{
    open_clinic_in_memory, ClinicCore, ClinicError, FfiDispenseLine, FfiDrug,
    FfiNewPrescriptionItem,
};
use std::sync::Arc;

fn drug(code: &str, price: &str, stock: i64, reorder: i64) -> FfiDrug {
    FfiDrug {
        code: code.into(),
        name: format!("{} brand", code),
        generic_name: None,
        category: None,
        unit: "tablets".into(),
        unit_price: price.into(),
        quantity_in_stock: stock,
        reorder_level: reorder,
        low_stock: false,
    }
}

struct Fixture {
    core: Arc<ClinicCore>,
    patient_id: String,
    doctor_id: String,
    pharmacist_id: String,
}

fn setup() -> Fixture {
    let core = open_clinic_in_memory().unwrap();
    let patient = core
        .register_patient("Jane".into(), "Doe".into(), None, None, None)
        .unwrap();
    let doctor = core.add_staff("Dr. Okafor".into(), "doctor".into()).unwrap();
    let pharmacist = core
        .add_staff("Amina Okafor".into(), "pharmacist".into())
        .unwrap();
    Fixture {
        core,
        patient_id: patient.patient_id,
        doctor_id: doctor.staff_id,
        pharmacist_id: pharmacist.staff_id,
    }
}

#[test]
fn test_register_and_lookup_patient() {
    let fixture = setup();

    let found = fixture
        .core
        .get_patient(fixture.patient_id.clone())
        .unwrap()
        .unwrap();
    assert_eq!(found.first_name, "Jane");
    assert!(found.clinic_number.starts_with("CLN-"));

    let by_number = fixture
        .core
        .find_patient_by_clinic_number(found.clinic_number.clone())
        .unwrap()
        .unwrap();
    assert_eq!(by_number.patient_id, fixture.patient_id);

    let hits = fixture.core.search_patients("doe".into(), 10).unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn test_unknown_role_is_validation_error() {
    let fixture = setup();
    let err = fixture
        .core
        .add_staff("X".into(), "janitor".into())
        .unwrap_err();
    assert!(matches!(err, ClinicError::ValidationError(_)));
}

#[test]
fn test_full_fulfillment_flow() {
    let fixture = setup();
    fixture.core.upsert_drug(drug("PARA-500", "1.50", 10, 20)).unwrap();

    let visit = fixture
        .core
        .record_visit(
            fixture.patient_id.clone(),
            fixture.doctor_id.clone(),
            Some("fever".into()),
        )
        .unwrap();

    let prescription = fixture
        .core
        .create_prescription(
            fixture.patient_id.clone(),
            fixture.doctor_id.clone(),
            Some(visit.visit_id.clone()),
            vec![FfiNewPrescriptionItem {
                drug_code: "PARA-500".into(),
                quantity: 5,
                dosage: Some("1 tablet twice daily".into()),
            }],
            None,
        )
        .unwrap();
    assert_eq!(prescription.status, "draft");
    assert_eq!(prescription.items.len(), 1);
    // Unit price frozen from the catalog
    assert_eq!(prescription.items[0].unit_price, "1.50");

    fixture
        .core
        .send_to_pharmacy(prescription.prescription_id.clone())
        .unwrap();

    let fulfillment = fixture
        .core
        .dispense_prescription(
            prescription.prescription_id.clone(),
            fixture.pharmacist_id.clone(),
            vec![FfiDispenseLine {
                prescription_item_id: prescription.items[0].id,
                drug_code: "PARA-500".into(),
                quantity: 5,
                unit_price: "1.50".into(),
                notes: None,
            }],
            Some("20".into()),
        )
        .unwrap();

    assert!(fulfillment.dispensing_number.starts_with("DSP-"));
    assert_eq!(fulfillment.prescription.status, "dispensed");
    assert_eq!(fulfillment.lines[0].stock_before, 10);
    assert_eq!(fulfillment.lines[0].stock_after, 5);
    assert_eq!(fulfillment.billing.medication_cost, "7.50");
    assert_eq!(fulfillment.billing.total_amount, "27.50");
    assert_eq!(fulfillment.billing.payment_status, "pending");

    // The drug is now low on stock
    let low = fixture.core.list_low_stock_drugs().unwrap();
    assert_eq!(low.len(), 1);
    assert!(low[0].low_stock);

    // Billing lookup and payment
    let billing = fixture
        .core
        .get_billing_for_prescription(prescription.prescription_id.clone())
        .unwrap()
        .unwrap();
    let paid = fixture
        .core
        .record_payment(billing.billing_id, "27.50".into())
        .unwrap();
    assert_eq!(paid.payment_status, "paid");

    // Export carries the invoice
    let csv = fixture.core.export_invoices_csv().unwrap();
    assert!(csv.contains(&fulfillment.billing.invoice_number));
    let json = fixture.core.export_invoices_json().unwrap();
    assert!(json.contains("PARA-500"));
}

#[test]
fn test_insufficient_stock_surfaces_as_typed_error() {
    let fixture = setup();
    fixture.core.upsert_drug(drug("PARA-500", "1.50", 2, 1)).unwrap();

    let prescription = fixture
        .core
        .create_prescription(
            fixture.patient_id.clone(),
            fixture.doctor_id.clone(),
            None,
            vec![FfiNewPrescriptionItem {
                drug_code: "PARA-500".into(),
                quantity: 5,
                dosage: None,
            }],
            None,
        )
        .unwrap();
    fixture
        .core
        .send_to_pharmacy(prescription.prescription_id.clone())
        .unwrap();

    let err = fixture
        .core
        .dispense_prescription(
            prescription.prescription_id.clone(),
            fixture.pharmacist_id.clone(),
            vec![FfiDispenseLine {
                prescription_item_id: prescription.items[0].id,
                drug_code: "PARA-500".into(),
                quantity: 5,
                unit_price: "1.50".into(),
                notes: None,
            }],
            None,
        )
        .unwrap_err();
    assert!(matches!(err, ClinicError::InsufficientStock(_)));

    // Full rollback: stock unchanged, no billing
    let unchanged = fixture.core.get_drug("PARA-500".into()).unwrap().unwrap();
    assert_eq!(unchanged.quantity_in_stock, 2);
    assert!(fixture
        .core
        .get_billing_for_prescription(prescription.prescription_id)
        .unwrap()
        .is_none());
}

#[test]
fn test_bad_money_string_is_validation_error() {
    let fixture = setup();
    let err = fixture
        .core
        .generate_billing("whatever".into(), Some("not-a-number".into()))
        .unwrap_err();
    assert!(matches!(err, ClinicError::ValidationError(_)));
}

#[test]
fn test_stock_adjustment_via_facade() {
    let fixture = setup();
    fixture.core.upsert_drug(drug("PARA-500", "1.50", 10, 5)).unwrap();

    let adjusted = fixture
        .core
        .adjust_drug_stock(
            "PARA-500".into(),
            90,
            fixture.pharmacist_id.clone(),
            Some("delivery".into()),
        )
        .unwrap();
    assert_eq!(adjusted.quantity_in_stock, 100);

    let ledger = fixture.core.list_stock_adjustments("PARA-500".into()).unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].delta, 90);
}
