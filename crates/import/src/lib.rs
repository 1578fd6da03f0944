//! `stocktake-import` — tabular count-file ingestion.
//!
//! Turns already-extracted tabular rows (spreadsheet readers are an external
//! concern) into typed count rows. Column positions come from documented
//! fixed offsets, with header-keyword auto-detection as a fallback layer
//! before the defaults apply. Malformed input missing required columns
//! aborts the whole parse — no partial result is ever produced.

pub mod columns;
pub mod parse;

pub use columns::{detect_complete_columns, detect_partial_columns, ColumnMap, PartialColumnMap};
pub use parse::{parse_complete_rows, parse_count_sheet, parse_partial_rows, ImportError};
