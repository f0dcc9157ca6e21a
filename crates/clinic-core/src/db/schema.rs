//! SQLite schema definition.

/// Complete database schema for the clinic core.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    patient_id TEXT PRIMARY KEY,
    clinic_number TEXT NOT NULL UNIQUE,           -- CLN-YYYY-NNNNN
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    date_of_birth TEXT,
    phone TEXT,
    address TEXT,
    notes TEXT,
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_last_name ON patients(last_name);
CREATE INDEX IF NOT EXISTS idx_patients_deleted ON patients(deleted);

-- ============================================================================
-- Staff
-- ============================================================================

CREATE TABLE IF NOT EXISTS staff (
    staff_id TEXT PRIMARY KEY,
    employee_number TEXT NOT NULL UNIQUE,         -- EMP-NNNN
    full_name TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('doctor', 'pharmacist', 'nurse', 'receptionist', 'admin')),
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_staff_role ON staff(role);

-- ============================================================================
-- Visits
-- ============================================================================

CREATE TABLE IF NOT EXISTS visits (
    visit_id TEXT PRIMARY KEY,
    visit_number TEXT NOT NULL UNIQUE,            -- VST-YYYYMMDD-NNNN
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    doctor_id TEXT NOT NULL REFERENCES staff(staff_id),
    reason TEXT,
    diagnosis TEXT,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'scheduled' CHECK (status IN ('scheduled', 'completed', 'cancelled')),
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_visits_patient ON visits(patient_id);
CREATE INDEX IF NOT EXISTS idx_visits_doctor ON visits(doctor_id);

-- ============================================================================
-- Drug Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS drugs (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    generic_name TEXT,
    category TEXT,
    unit TEXT NOT NULL DEFAULT 'unit',
    unit_price TEXT NOT NULL DEFAULT '0',         -- decimal as text
    quantity_in_stock INTEGER NOT NULL DEFAULT 0 CHECK (quantity_in_stock >= 0),
    reorder_level INTEGER NOT NULL DEFAULT 0,
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- FTS5 virtual table for drug search
CREATE VIRTUAL TABLE IF NOT EXISTS drugs_fts USING fts5(
    code,
    name,
    generic_name,
    content='drugs',
    content_rowid='rowid'
);

-- Triggers to keep FTS5 in sync with main table
CREATE TRIGGER IF NOT EXISTS drugs_ai AFTER INSERT ON drugs BEGIN
    INSERT INTO drugs_fts(rowid, code, name, generic_name)
    VALUES (new.rowid, new.code, new.name, new.generic_name);
END;

CREATE TRIGGER IF NOT EXISTS drugs_ad AFTER DELETE ON drugs BEGIN
    INSERT INTO drugs_fts(drugs_fts, rowid, code, name, generic_name)
    VALUES ('delete', old.rowid, old.code, old.name, old.generic_name);
END;

CREATE TRIGGER IF NOT EXISTS drugs_au AFTER UPDATE ON drugs BEGIN
    INSERT INTO drugs_fts(drugs_fts, rowid, code, name, generic_name)
    VALUES ('delete', old.rowid, old.code, old.name, old.generic_name);
    INSERT INTO drugs_fts(rowid, code, name, generic_name)
    VALUES (new.rowid, new.code, new.name, new.generic_name);
END;

CREATE INDEX IF NOT EXISTS idx_drugs_deleted ON drugs(deleted);

-- ============================================================================
-- Prescriptions
-- ============================================================================

CREATE TABLE IF NOT EXISTS prescriptions (
    prescription_id TEXT PRIMARY KEY,
    prescription_number TEXT NOT NULL UNIQUE,     -- RX-YYYYMMDD-NNNN
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    visit_id TEXT REFERENCES visits(visit_id),
    doctor_id TEXT NOT NULL REFERENCES staff(staff_id),
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN (
        'draft', 'sent_to_pharmacy', 'processing', 'ready_for_pickup', 'dispensed', 'cancelled'
    )),
    sent_to_pharmacy_at TEXT,
    dispensed_at TEXT,
    dispensed_by TEXT REFERENCES staff(staff_id),
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_prescriptions_patient ON prescriptions(patient_id);
CREATE INDEX IF NOT EXISTS idx_prescriptions_status ON prescriptions(status);

CREATE TABLE IF NOT EXISTS prescription_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prescription_id TEXT NOT NULL REFERENCES prescriptions(prescription_id),
    drug_code TEXT NOT NULL REFERENCES drugs(code),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    quantity_dispensed INTEGER,
    unit_price TEXT NOT NULL,                     -- frozen at prescription time
    dosage TEXT
);

CREATE INDEX IF NOT EXISTS idx_prescription_items_rx ON prescription_items(prescription_id);

-- ============================================================================
-- Dispensing Ledger (Append-Only - Immutable after creation)
-- ============================================================================

CREATE TABLE IF NOT EXISTS dispensings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dispensing_number TEXT NOT NULL,              -- DSP-YYYYMMDD-NNNN, shared per workflow call
    prescription_id TEXT NOT NULL REFERENCES prescriptions(prescription_id),
    prescription_item_id INTEGER REFERENCES prescription_items(id),
    drug_code TEXT NOT NULL REFERENCES drugs(code),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    unit_price TEXT NOT NULL,
    stock_before INTEGER NOT NULL,
    stock_after INTEGER NOT NULL CHECK (stock_after >= 0),
    pharmacist_id TEXT NOT NULL REFERENCES staff(staff_id),
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_dispensings_number ON dispensings(dispensing_number);
CREATE INDEX IF NOT EXISTS idx_dispensings_rx ON dispensings(prescription_id);
CREATE INDEX IF NOT EXISTS idx_dispensings_drug ON dispensings(drug_code);

-- Manual stock adjustments share the ledger posture: write once, never touch
CREATE TABLE IF NOT EXISTS stock_adjustments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    drug_code TEXT NOT NULL REFERENCES drugs(code),
    delta INTEGER NOT NULL,
    stock_before INTEGER NOT NULL,
    stock_after INTEGER NOT NULL CHECK (stock_after >= 0),
    staff_id TEXT NOT NULL REFERENCES staff(staff_id),
    reason TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_stock_adjustments_drug ON stock_adjustments(drug_code);

-- ============================================================================
-- Billings
-- ============================================================================

CREATE TABLE IF NOT EXISTS billings (
    billing_id TEXT PRIMARY KEY,
    invoice_number TEXT NOT NULL UNIQUE,          -- INV-YYYYMMDD-NNNN
    prescription_id TEXT NOT NULL UNIQUE REFERENCES prescriptions(prescription_id),
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    consultation_fee TEXT NOT NULL DEFAULT '0',
    medication_cost TEXT NOT NULL DEFAULT '0',
    total_amount TEXT NOT NULL DEFAULT '0',
    amount_paid TEXT NOT NULL DEFAULT '0',
    payment_status TEXT NOT NULL DEFAULT 'pending' CHECK (payment_status IN (
        'pending', 'partially_paid', 'paid'
    )),
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_billings_patient ON billings(patient_id);
CREATE INDEX IF NOT EXISTS idx_billings_status ON billings(payment_status);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_fts_trigger() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO drugs (code, name, generic_name, unit, unit_price) VALUES (?, ?, ?, 'tablets', '1.50')",
            ["PARA-500", "Panadol 500mg", "paracetamol"],
        )
        .unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM drugs_fts WHERE drugs_fts MATCH 'panadol'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);

        // Generic name is searchable too
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM drugs_fts WHERE drugs_fts MATCH 'paracetamol'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_stock_cannot_go_negative() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO drugs (code, name, unit, unit_price, quantity_in_stock) VALUES ('X', 'X', 'unit', '0', 5)",
            [],
        )
        .unwrap();

        let result = conn.execute("UPDATE drugs SET quantity_in_stock = -1 WHERE code = 'X'", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_billing_unique_per_prescription() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO patients (patient_id, clinic_number, first_name, last_name) VALUES ('p1', 'CLN-2024-00001', 'A', 'B')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO staff (staff_id, employee_number, full_name, role) VALUES ('s1', 'EMP-0001', 'Doc', 'doctor')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO prescriptions (prescription_id, prescription_number, patient_id, doctor_id) VALUES ('rx1', 'RX-20240115-0001', 'p1', 's1')",
            [],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO billings (billing_id, invoice_number, prescription_id, patient_id) VALUES ('b1', 'INV-20240115-0001', 'rx1', 'p1')",
            [],
        )
        .unwrap();

        // Second billing for the same prescription must be rejected
        let result = conn.execute(
            "INSERT INTO billings (billing_id, invoice_number, prescription_id, patient_id) VALUES ('b2', 'INV-20240115-0002', 'rx1', 'p1')",
            [],
        );
        assert!(result.is_err());
    }
}
