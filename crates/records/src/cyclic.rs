use serde::{Deserialize, Serialize};

use stocktake_core::{DomainError, DomainResult};

use crate::record::InventoryRecord;

/// Absolute unit variance above which an edit is a high-severity candidate.
pub const HIGH_DIFF_UNITS: i64 = 50;

/// Relative variance (|diff| / system stock) that must also be exceeded for
/// the unit path to flag high severity.
pub const HIGH_DIFF_RATIO: f64 = 0.5;

/// Monetary variance threshold in smallest currency unit (50 000.00).
pub const HIGH_DIFF_VALUE_CENTS: i64 = 5_000_000;

/// Quantity above which a count is a probable typo (validation warning).
pub const HIGH_QUANTITY_WARN: i64 = 10_000;

/// Counting lifecycle status of a cyclic item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountStatus {
    /// Imported, not yet confirmed or counted.
    Pending,
    /// A user confirmed or entered a count.
    Controlled,
    /// Finalized through a bulk adjustment over the group.
    Adjusted,
}

/// Severity of a single edit, for UI feedback intensity. Informational only;
/// it never blocks the edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    None,
    Normal,
    High,
}

/// A counted item inside a cyclic counting session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclicItem {
    pub record: InventoryRecord,
    status: CountStatus,
    was_readjusted: bool,
}

impl CyclicItem {
    /// Items enter the cycle `pending` on import.
    pub fn new(record: InventoryRecord) -> Self {
        Self {
            record,
            status: CountStatus::Pending,
            was_readjusted: false,
        }
    }

    pub fn status(&self) -> CountStatus {
        self.status
    }

    /// True once an already-adjusted item was edited again. Irreversible.
    pub fn was_readjusted(&self) -> bool {
        self.was_readjusted
    }

    /// Confirm the system quantity as counted: `pending → controlled`,
    /// `counted := system` (no variance). Re-confirming a controlled item is
    /// an idempotent no-op; adjusted items cannot be confirmed.
    pub fn confirm(&mut self) -> DomainResult<()> {
        match self.status {
            CountStatus::Pending => {
                self.record.counted_qty = Some(self.record.system_qty);
                self.status = CountStatus::Controlled;
                Ok(())
            }
            CountStatus::Controlled => Ok(()),
            CountStatus::Adjusted => Err(DomainError::invariant(
                "cannot confirm an adjusted item; edit it instead",
            )),
        }
    }

    /// Record a counted quantity.
    ///
    /// `pending|controlled → controlled`. An `adjusted` item stays adjusted
    /// and is marked readjusted instead of changing status. Returns the
    /// anomaly classification of the resulting variance.
    pub fn set_quantity(&mut self, qty: i64) -> DomainResult<AnomalySeverity> {
        match self.status {
            CountStatus::Pending | CountStatus::Controlled => {
                self.status = CountStatus::Controlled;
            }
            CountStatus::Adjusted => {
                self.was_readjusted = true;
            }
        }
        self.record.counted_qty = Some(qty);
        Ok(self.anomaly())
    }

    /// Explicit revert: `controlled → pending`, clearing the count. Not valid
    /// from `pending` or `adjusted`.
    pub fn revert(&mut self) -> DomainResult<()> {
        match self.status {
            CountStatus::Controlled => {
                self.record.counted_qty = None;
                self.status = CountStatus::Pending;
                Ok(())
            }
            CountStatus::Pending => Err(DomainError::invariant("item is not controlled")),
            CountStatus::Adjusted => {
                Err(DomainError::invariant("adjusted items cannot be reverted"))
            }
        }
    }

    /// Bulk-finalization hook used by the sheet; not exposed as a standalone
    /// transition (single items never become adjusted on their own).
    pub(crate) fn mark_adjusted(&mut self) {
        self.status = CountStatus::Adjusted;
    }

    /// Classify the current variance for feedback intensity.
    pub fn anomaly(&self) -> AnomalySeverity {
        let Some(diff) = self.record.diff() else {
            return AnomalySeverity::None;
        };

        let abs_qty = diff.qty.abs();
        let ratio = abs_qty as f64 / self.record.system_qty.max(1) as f64;
        let abs_value = abs_qty.saturating_mul(self.record.unit_cost_cents());

        if (abs_qty > HIGH_DIFF_UNITS && ratio > HIGH_DIFF_RATIO)
            || abs_value > HIGH_DIFF_VALUE_CENTS
        {
            AnomalySeverity::High
        } else if diff.qty != 0 {
            AnomalySeverity::Normal
        } else {
            AnomalySeverity::None
        }
    }
}
