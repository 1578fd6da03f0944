use std::collections::HashSet;

use thiserror::Error;

use stocktake_core::{BranchId, Ean, GroupTag};
use stocktake_records::{CountSheet, InventoryRecord};
use stocktake_reconcile::{CompleteRow, PartialRow};

use crate::columns::{detect_complete_columns, detect_partial_columns, ColumnMap, PartialColumnMap};

/// Fatal parse failure. The whole import is aborted; no partial row set is
/// ever returned as if it were complete.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("row {row} is missing required column '{column}'")]
    MissingColumn { row: usize, column: &'static str },

    #[error("row {row}, column '{column}': cannot parse {value:?}")]
    MalformedCell {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: duplicate identifier {ean}")]
    DuplicateIdentifier { row: usize, ean: String },
}

/// Parse complete-layout rows (two-source merge mode: the branch file).
///
/// The first row is checked for header keywords; when all columns are
/// recognized the detected map is used and the header skipped, otherwise the
/// documented fixed offsets apply to every row.
pub fn parse_complete_rows(rows: &[Vec<String>]) -> Result<Vec<CompleteRow>, ImportError> {
    let (map, data) = match rows.first().and_then(|h| detect_complete_columns(h)) {
        Some(map) => (map, &rows[1..]),
        None => (ColumnMap::default(), rows),
    };

    let mut out = Vec::with_capacity(data.len());
    for (row_no, row) in data.iter().enumerate() {
        if is_blank(row) {
            continue;
        }
        if let Some(column) = map.first_missing(row.len()) {
            return Err(ImportError::MissingColumn { row: row_no, column });
        }

        out.push(CompleteRow {
            ean: row[map.identifier].clone(),
            name: row[map.name].trim().to_string(),
            branch_qty: parse_qty(&row[map.counted], row_no, "counted")?.unwrap_or(0),
            system_qty: parse_qty(&row[map.system], row_no, "system")?.unwrap_or(0),
            unit_cost_cents: parse_money_cents(&row[map.cost], row_no, "cost")?,
        });
    }
    Ok(out)
}

/// Parse partial-layout rows (two-source merge mode: the subset-team file).
pub fn parse_partial_rows(rows: &[Vec<String>]) -> Result<Vec<PartialRow>, ImportError> {
    let (map, data) = match rows.first().and_then(|h| detect_partial_columns(h)) {
        Some(map) => (map, &rows[1..]),
        None => (PartialColumnMap::default(), rows),
    };

    let mut out = Vec::with_capacity(data.len());
    for (row_no, row) in data.iter().enumerate() {
        if is_blank(row) {
            continue;
        }
        if let Some(column) = map.first_missing(row.len()) {
            return Err(ImportError::MissingColumn { row: row_no, column });
        }

        out.push(PartialRow {
            ean: row[map.identifier].clone(),
            qty: parse_qty(&row[map.qty], row_no, "quantity")?.unwrap_or(0),
        });
    }
    Ok(out)
}

/// Parse a single-source import straight into a pending `CountSheet`.
///
/// A blank counted cell is the "not yet counted" sentinel, not zero.
/// Duplicate identifiers abort the import: the sheet is keyed by EAN, so
/// letting a later row silently replace an earlier one would hide a bad
/// export.
pub fn parse_count_sheet(
    branch: BranchId,
    group: GroupTag,
    rows: &[Vec<String>],
) -> Result<CountSheet, ImportError> {
    let (map, data) = match rows.first().and_then(|h| detect_complete_columns(h)) {
        Some(map) => (map, &rows[1..]),
        None => (ColumnMap::default(), rows),
    };

    let mut records = Vec::with_capacity(data.len());
    let mut seen: HashSet<Ean> = HashSet::with_capacity(data.len());
    for (row_no, row) in data.iter().enumerate() {
        if is_blank(row) {
            continue;
        }
        if let Some(column) = map.first_missing(row.len()) {
            return Err(ImportError::MissingColumn { row: row_no, column });
        }

        let ean = Ean::new(&row[map.identifier]);
        if !ean.is_empty() && !seen.insert(ean.clone()) {
            return Err(ImportError::DuplicateIdentifier {
                row: row_no,
                ean: ean.to_string(),
            });
        }

        let mut record = InventoryRecord::new(
            ean,
            row[map.name].trim().to_string(),
            parse_qty(&row[map.system], row_no, "system")?.unwrap_or(0),
            parse_money_cents(&row[map.cost], row_no, "cost")?,
        )
        .with_group(group.clone());
        if let Some(counted) = parse_qty(&row[map.counted], row_no, "counted")? {
            record.counted_qty = Some(counted);
        }
        records.push(record);
    }

    Ok(CountSheet::from_records(branch, group, records))
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Blank cell → `None`; anything else must be an integer.
fn parse_qty(cell: &str, row: usize, column: &'static str) -> Result<Option<i64>, ImportError> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<i64>()
        .map(Some)
        .map_err(|_| ImportError::MalformedCell {
            row,
            column,
            value: cell.to_string(),
        })
}

/// Parse a currency cell into cents.
///
/// Accepts plain decimals with `.` or `,` as the decimal separator and an
/// optional thousands separator ("4.99", "4,99", "1.234,56", "R$ 12,00").
fn parse_money_cents(cell: &str, row: usize, column: &'static str) -> Result<i64, ImportError> {
    let malformed = || ImportError::MalformedCell {
        row,
        column,
        value: cell.trim().to_string(),
    };

    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() {
        return Err(malformed());
    }

    // When both separators appear, the rightmost one is the decimal mark.
    let decimal_sep = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
        (Some(_), None) => Some('.'),
        (None, Some(_)) => Some(','),
        (None, None) => None,
    };

    let (int_part, frac_part) = match decimal_sep {
        Some(sep) => {
            let idx = cleaned.rfind(sep).unwrap_or(cleaned.len());
            (&cleaned[..idx], &cleaned[idx + 1..])
        }
        None => (cleaned.as_str(), ""),
    };

    let int_digits: String = int_part.chars().filter(|c| *c != '.' && *c != ',').collect();
    let negative = int_digits.starts_with('-');
    let mut int_digits: String = int_digits.chars().filter(|c| c.is_ascii_digit()).collect();
    let mut frac_part = frac_part;
    if frac_part.len() == 3 && frac_part.chars().all(|c| c.is_ascii_digit()) {
        // Exactly three digits after a lone separator is a thousands group
        // ("1.234"), not a fraction.
        int_digits.push_str(frac_part);
        frac_part = "";
    }
    if frac_part.len() > 2 || frac_part.chars().any(|c| !c.is_ascii_digit()) {
        return Err(malformed());
    }
    if int_digits.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }

    let units: i64 = if int_digits.is_empty() {
        0
    } else {
        int_digits.parse().map_err(|_| malformed())?
    };
    let cents_frac: i64 = match frac_part.len() {
        0 => 0,
        1 => frac_part.parse::<i64>().map_err(|_| malformed())? * 10,
        _ => frac_part.parse().map_err(|_| malformed())?,
    };

    let total = units * 100 + cents_frac;
    Ok(if negative { -total } else { total })
}
