//! Domain models for the clinic management core.

mod billing;
mod dispensing;
mod drug;
mod patient;
mod prescription;
mod staff;
mod visit;

pub use billing::*;
pub use dispensing::*;
pub use drug::*;
pub use patient::*;
pub use prescription::*;
pub use staff::*;
pub use visit::*;
