use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocktake_catalog::Catalog;
use stocktake_core::Ean;
use stocktake_records::{cyclic::HIGH_QUANTITY_WARN, CountStatus, CyclicItem};

/// Variance ratio above which a controlled item draws a warning (>90%).
pub const HIGH_VARIANCE_RATIO: f64 = 0.9;

/// Blocking validation problem: the batch must not be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("batch is empty")]
    EmptyBatch,

    #[error("row {row} is missing an identifier")]
    MissingIdentifier { row: usize },

    #[error("negative counted quantity {qty} for {ean}")]
    NegativeQuantity { ean: Ean, qty: i64 },

    #[error("duplicate identifier {ean} in batch")]
    DuplicateIdentifier { ean: Ean },

    #[error("identifier {ean} is unknown to the catalog")]
    UnknownCatalogEntry { ean: Ean },

    #[error("catalog lookup failed: {0}")]
    CatalogUnavailable(String),
}

/// Non-blocking finding: surfaced to the user, never blocks the save.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationWarning {
    #[error("counted quantity {qty} for {ean} looks like a typo")]
    HighQuantity { ean: Ean, qty: i64 },

    #[error("controlled item {ean} deviates more than 90% from system stock")]
    HighVarianceWhileControlled { ean: Ean },
}

/// Complete result of one validation pass over a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn first_error(&self) -> Option<&ValidationError> {
        self.errors.first()
    }
}

/// Validate a batch against structural rules and the external catalog.
///
/// Catalog existence is checked with **one batched lookup**, never per item.
/// A failed catalog call is reported as a blocking error on the report — the
/// batch is not waved through on infrastructure trouble.
pub fn validate(items: &[CyclicItem], catalog: &dyn Catalog) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if items.is_empty() {
        errors.push(ValidationError::EmptyBatch);
        return ValidationReport { errors, warnings };
    }

    let mut seen: HashSet<&Ean> = HashSet::with_capacity(items.len());
    let mut lookup: Vec<Ean> = Vec::with_capacity(items.len());

    for (row, item) in items.iter().enumerate() {
        let record = &item.record;

        if record.ean.is_empty() {
            errors.push(ValidationError::MissingIdentifier { row });
        } else {
            if !seen.insert(&record.ean) {
                errors.push(ValidationError::DuplicateIdentifier {
                    ean: record.ean.clone(),
                });
            } else {
                lookup.push(record.ean.clone());
            }
        }

        if let Some(qty) = record.counted_qty {
            if qty < 0 {
                errors.push(ValidationError::NegativeQuantity {
                    ean: record.ean.clone(),
                    qty,
                });
            }
            if qty > HIGH_QUANTITY_WARN {
                warnings.push(ValidationWarning::HighQuantity {
                    ean: record.ean.clone(),
                    qty,
                });
            }
        }

        if item.status() == CountStatus::Controlled {
            if let Some(diff) = record.diff() {
                // Zero system stock makes any nonzero count an extreme variance.
                let high_variance = if record.system_qty == 0 {
                    diff.qty != 0
                } else {
                    diff.qty.abs() as f64 / record.system_qty.abs() as f64 > HIGH_VARIANCE_RATIO
                };
                if high_variance {
                    warnings.push(ValidationWarning::HighVarianceWhileControlled {
                        ean: record.ean.clone(),
                    });
                }
            }
        }
    }

    match catalog.resolve_batch(&lookup) {
        Ok(known) => {
            for ean in &lookup {
                if !known.contains_key(ean) {
                    errors.push(ValidationError::UnknownCatalogEntry { ean: ean.clone() });
                }
            }
        }
        Err(err) => errors.push(ValidationError::CatalogUnavailable(err.to_string())),
    }

    ValidationReport { errors, warnings }
}
