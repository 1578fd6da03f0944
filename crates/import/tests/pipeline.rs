//! End-to-end flow: raw tables → merge → cyclic lifecycle → validation →
//! dashboard rollup.

use std::collections::HashMap;

use stocktake_catalog::{Catalog, CatalogEntry};
use stocktake_core::{BranchId, Ean, GroupTag};
use stocktake_import::{parse_complete_rows, parse_partial_rows};
use stocktake_records::{CountSheet, CountStatus, FinalizeAdjustments};
use stocktake_reconcile::merge_counts;
use stocktake_stats::{reduce_branch, reduce_group, FixedGoal, GroupStatus};
use stocktake_validation::validate;

struct AllKnownCatalog;

impl Catalog for AllKnownCatalog {
    fn resolve_batch(&self, eans: &[Ean]) -> anyhow::Result<HashMap<Ean, CatalogEntry>> {
        Ok(eans
            .iter()
            .map(|e| {
                (
                    e.clone(),
                    CatalogEntry {
                        name: e.to_string(),
                        unit_cost_cents: 100,
                    },
                )
            })
            .collect())
    }
}

fn table(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect()
}

#[test]
fn two_source_count_from_files_to_dashboard() {
    // Branch export with a header; the subset team's file without one.
    let complete = table(&[
        &["EAN", "Nome", "Qtd Contada", "Estoque Sistema", "Custo"],
        &["12345678", "Dipirona 500mg", "5", "10", "2,00"],
        &["22222222", "Amoxicilina", "7", "7", "3,00"],
    ]);
    let partial = table(&[&[" 12.345.678 ", "2"], &["12345678", "1"]]);

    let complete_rows = parse_complete_rows(&complete).unwrap();
    let partial_rows = parse_partial_rows(&partial).unwrap();

    let outcome = merge_counts(&partial_rows, &complete_rows).unwrap();
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.general.len(), 2);
    assert_eq!(outcome.partial.len(), 1);
    assert_eq!(outcome.branch.len(), 1);

    // General view: 5 + (2+1) = 8 counted against 10 system at 200 cents.
    let general = &outcome.general[0];
    assert_eq!(general.counted_qty, Some(8));
    let diff = general.diff().unwrap();
    assert_eq!(diff.qty, -2);
    assert_eq!(diff.value_cents, -400);

    // Reconciled counts feed a cyclic sheet; everything starts pending.
    let branch = BranchId::new();
    let group = GroupTag::new("antibiotics");
    let mut sheet = CountSheet::from_records(branch, group, outcome.general.clone());
    assert!(sheet
        .items()
        .iter()
        .all(|it| it.status() == CountStatus::Pending));

    // Accept the merged counts as controlled.
    let merged: Vec<(Ean, i64)> = outcome
        .general
        .iter()
        .map(|r| (r.ean.clone(), r.counted_qty.unwrap()))
        .collect();
    for (ean, qty) in merged {
        sheet.set_quantity(&ean, qty).unwrap();
    }

    // The batch passes validation against the catalog.
    let report = validate(sheet.items(), &AllKnownCatalog);
    assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);

    // Finalizing the shortage requires an adjustment document.
    assert!(sheet.finalize(&FinalizeAdjustments::default()).is_err());
    let moved = sheet
        .finalize(&FinalizeAdjustments {
            shortage_id: Some("ADJ-77".into()),
            surplus_id: None,
        })
        .unwrap();
    assert_eq!(moved, 2);

    // Dashboard rollup: group complete, shortage bucket carries the -400.
    let stats = reduce_group(sheet.items());
    assert_eq!(stats.status, GroupStatus::Complete);
    assert_eq!(stats.progress, 100.0);
    assert_eq!(stats.shortage_value_cents, -400);
    assert_eq!(stats.surplus_value_cents, 0);

    let branch_stats = reduce_branch(branch, &[stats], &FixedGoal(4));
    assert_eq!(branch_stats.completed_groups, 1);
    assert_eq!(branch_stats.progress, 25.0);
}
