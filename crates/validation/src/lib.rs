//! `stocktake-validation` — batch integrity checks before persistence.
//!
//! Pure: `validate` never mutates its inputs and reports the complete list of
//! problems in one pass — blocking errors plus non-blocking warnings.

pub mod validate;

pub use validate::{validate, ValidationError, ValidationReport, ValidationWarning};
