//! Invoice export to JSON and CSV.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::{Database, DbError, DbResult};
use crate::models::Billing;

/// Export of a single invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceExport {
    /// Export metadata
    pub metadata: InvoiceMetadata,
    /// Line items billed
    pub lines: Vec<InvoiceLine>,
}

/// Invoice export metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceMetadata {
    /// Invoice number
    pub invoice_number: String,
    /// Prescription number for traceability
    pub prescription_number: String,
    /// Patient clinic number
    pub clinic_number: String,
    /// Patient display name
    pub patient_name: String,
    /// Consultation fee
    pub consultation_fee: Decimal,
    /// Medication cost
    pub medication_cost: Decimal,
    /// Total amount
    pub total_amount: Decimal,
    /// Amount paid so far
    pub amount_paid: Decimal,
    /// Payment status string
    pub payment_status: String,
    /// When the invoice was issued
    pub issued_at: String,
    /// Export timestamp
    pub exported_at: String,
}

/// Single line item on an exported invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Drug code
    pub drug_code: String,
    /// Item description
    pub description: String,
    /// Quantity billed (dispensed if known, prescribed otherwise)
    pub quantity: i64,
    /// Frozen unit price
    pub unit_price: Decimal,
    /// quantity × unit_price
    pub line_total: Decimal,
}

impl InvoiceExport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        csv.push_str(CSV_HEADER);
        push_csv_lines(&mut csv, self);
        csv
    }
}

/// Batch invoice export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInvoiceExport {
    /// Export timestamp
    pub exported_at: String,
    /// Individual invoice exports
    pub invoices: Vec<InvoiceExport>,
    /// Total line count
    pub total_lines: usize,
}

impl BatchInvoiceExport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        csv.push_str(CSV_HEADER);
        for invoice in &self.invoices {
            push_csv_lines(&mut csv, invoice);
        }
        csv
    }
}

const CSV_HEADER: &str = "invoice_number,prescription_number,clinic_number,patient_name,\
                          drug_code,description,quantity,unit_price,line_total,\
                          total_amount,payment_status,issued_at\n";

fn push_csv_lines(csv: &mut String, invoice: &InvoiceExport) {
    for line in &invoice.lines {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}\n",
            escape_csv(&invoice.metadata.invoice_number),
            escape_csv(&invoice.metadata.prescription_number),
            escape_csv(&invoice.metadata.clinic_number),
            escape_csv(&invoice.metadata.patient_name),
            escape_csv(&line.drug_code),
            escape_csv(&line.description),
            line.quantity,
            line.unit_price,
            line.line_total,
            invoice.metadata.total_amount,
            escape_csv(&invoice.metadata.payment_status),
            escape_csv(&invoice.metadata.issued_at),
        ));
    }
}

/// Invoice exporter. Reads through tombstones: a retired patient or
/// prescription still appears on the books.
pub struct InvoiceExporter<'a> {
    db: &'a Database,
}

impl<'a> InvoiceExporter<'a> {
    /// Create a new invoice exporter.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Export a single billing with its prescription context.
    pub fn export_billing(&self, billing: &Billing) -> DbResult<InvoiceExport> {
        let prescription = self
            .db
            .get_prescription_including_deleted(&billing.prescription_id)?
            .ok_or_else(|| DbError::NotFound(format!("prescription {}", billing.prescription_id)))?;
        let patient = self
            .db
            .get_patient_including_deleted(&billing.patient_id)?
            .ok_or_else(|| DbError::NotFound(format!("patient {}", billing.patient_id)))?;
        let items = self.db.get_prescription_items(&billing.prescription_id)?;
        let patient_name = patient.display_name();

        let lines = items
            .iter()
            .map(|item| {
                let description = self
                    .db
                    .get_drug(&item.drug_code)
                    .ok()
                    .flatten()
                    .map(|drug| drug.name)
                    .unwrap_or_else(|| item.drug_code.clone());
                InvoiceLine {
                    drug_code: item.drug_code.clone(),
                    description,
                    quantity: item.billable_quantity(),
                    unit_price: item.unit_price,
                    line_total: item.line_cost(),
                }
            })
            .collect();

        Ok(InvoiceExport {
            metadata: InvoiceMetadata {
                invoice_number: billing.invoice_number.clone(),
                prescription_number: prescription.prescription_number,
                clinic_number: patient.clinic_number,
                patient_name,
                consultation_fee: billing.consultation_fee,
                medication_cost: billing.medication_cost,
                total_amount: billing.total_amount,
                amount_paid: billing.amount_paid,
                payment_status: billing.payment_status.as_str().to_string(),
                issued_at: billing.created_at.clone(),
                exported_at: chrono::Utc::now().to_rfc3339(),
            },
            lines,
        })
    }

    /// Export all live billings.
    pub fn export_all(&self) -> DbResult<BatchInvoiceExport> {
        self.batch(self.db.list_billings()?)
    }

    /// Export live billings created at or after `since` (RFC 3339).
    pub fn export_since(&self, since: &str) -> DbResult<BatchInvoiceExport> {
        self.batch(self.db.list_billings_since(since)?)
    }

    fn batch(&self, billings: Vec<Billing>) -> DbResult<BatchInvoiceExport> {
        let mut invoices = Vec::with_capacity(billings.len());
        let mut total_lines = 0;
        for billing in &billings {
            let export = self.export_billing(billing)?;
            total_lines += export.lines.len();
            invoices.push(export);
        }
        Ok(BatchInvoiceExport {
            exported_at: chrono::Utc::now().to_rfc3339(),
            invoices,
            total_lines,
        })
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
