use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocktake_core::{DomainError, DomainResult, Ean};
use stocktake_records::InventoryRecord;

/// One row of the partial (subset-team) count file: identifier + quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialRow {
    pub ean: String,
    pub qty: i64,
}

/// One row of the complete (branch) count file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteRow {
    pub ean: String,
    pub name: String,
    pub branch_qty: i64,
    pub system_qty: i64,
    pub unit_cost_cents: i64,
}

/// Non-fatal merge warning.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MergeWarning {
    /// No partial row matched the complete set, or the partial set was
    /// empty — usually an identifier-format mismatch between the two exports
    /// or the wrong file.
    #[error("no partial rows matched the complete set")]
    NoPartialMatches,
}

/// Output of the two-source merge.
///
/// Every EAN of the complete set appears in exactly one of `partial`/`branch`
/// and always in `general`; `partial.len() + branch.len() == general.len()`.
/// Partial-set EANs absent from the complete set have no reference row to
/// attach system quantity and cost to; they are dropped and reported here —
/// a documented limitation, not a silent fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub general: Vec<InventoryRecord>,
    pub partial: Vec<InventoryRecord>,
    pub branch: Vec<InventoryRecord>,
    pub dropped: Vec<Ean>,
    pub warnings: Vec<MergeWarning>,
}

/// Merge the partial and complete count sources.
///
/// EANs are normalized before any map insertion or lookup. Duplicate EANs
/// within the **partial** set are summed (a physical count submitted in two
/// batches counts twice); duplicates within the **complete** set are a
/// conflict — no summation rule exists for the branch file.
///
/// Runs in O(n) using hash-map lookups only; views preserve complete-set row
/// order, so re-running on unchanged inputs yields identical outputs.
pub fn merge_counts(
    partial_rows: &[PartialRow],
    complete_rows: &[CompleteRow],
) -> DomainResult<MergeOutcome> {
    let mut partial_map: HashMap<Ean, i64> = HashMap::with_capacity(partial_rows.len());
    for row in partial_rows {
        let ean = Ean::new(&row.ean);
        if ean.is_empty() {
            return Err(DomainError::validation(
                "partial row has an empty identifier",
            ));
        }
        *partial_map.entry(ean).or_insert(0) += row.qty;
    }

    let mut general = Vec::with_capacity(complete_rows.len());
    let mut partial = Vec::new();
    let mut branch = Vec::new();
    let mut seen: HashSet<Ean> = HashSet::with_capacity(complete_rows.len());
    let mut matched = 0usize;

    for row in complete_rows {
        let ean = Ean::new(&row.ean);
        if ean.is_empty() {
            return Err(DomainError::validation(
                "complete row has an empty identifier",
            ));
        }
        if !seen.insert(ean.clone()) {
            return Err(DomainError::conflict(format!(
                "duplicate identifier in complete set: {ean}"
            )));
        }

        let base = InventoryRecord::new(
            ean.clone(),
            row.name.clone(),
            row.system_qty,
            row.unit_cost_cents,
        );

        match partial_map.get(&ean) {
            Some(&partial_qty) => {
                matched += 1;
                general.push(base.clone().with_counted(row.branch_qty + partial_qty));
                partial.push(base.with_counted(partial_qty));
            }
            None => {
                general.push(base.clone().with_counted(row.branch_qty));
                branch.push(base.with_counted(row.branch_qty));
            }
        }
    }

    let mut dropped: Vec<Ean> = partial_map
        .keys()
        .filter(|ean| !seen.contains(*ean))
        .cloned()
        .collect();
    dropped.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    if !dropped.is_empty() {
        tracing::warn!(
            count = dropped.len(),
            "partial-count identifiers absent from the complete set were dropped"
        );
    }

    let mut warnings = Vec::new();
    if matched == 0 {
        // Still a successful merge; the caller should alert the user to a
        // likely identifier-format mismatch.
        tracing::warn!("merge produced no partial matches");
        warnings.push(MergeWarning::NoPartialMatches);
    }

    Ok(MergeOutcome {
        general,
        partial,
        branch,
        dropped,
        warnings,
    })
}
