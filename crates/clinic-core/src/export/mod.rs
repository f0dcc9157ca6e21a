//! Invoice export for external accounting systems.

mod invoices;

pub use invoices::*;
