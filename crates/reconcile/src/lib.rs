//! `stocktake-reconcile` — three-way merge of collaborative counts.
//!
//! Combines two independently collected count sources — a partial count by a
//! subset team and a complete branch count — into three consistent views:
//! counted-by-subset (`partial`), counted-by-branch-only (`branch`) and the
//! reconciled union (`general`).

pub mod merge;

pub use merge::{merge_counts, CompleteRow, MergeOutcome, MergeWarning, PartialRow};
