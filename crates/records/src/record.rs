use serde::{Deserialize, Serialize};

use stocktake_core::{Ean, GroupTag, ValueObject};

/// One countable product position: system-recorded stock vs. physical count.
///
/// `counted_qty == None` is the explicit "not yet counted" sentinel, distinct
/// from a counted zero. Difference figures are **derived, never stored**:
/// every consumer recomputes them via [`InventoryRecord::diff`] so a stale
/// cached variance can never survive an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub ean: Ean,
    pub name: String,
    /// System-recorded stock (authoritative reference).
    pub system_qty: i64,
    pub counted_qty: Option<i64>,
    /// Unit cost in smallest currency unit (e.g., cents). Always >= 0.
    unit_cost_cents: i64,
    pub group: Option<GroupTag>,
}

impl InventoryRecord {
    /// Create a record. Negative unit costs are clamped to zero at this
    /// boundary and logged; downstream code can rely on `unit_cost >= 0`.
    pub fn new(ean: Ean, name: impl Into<String>, system_qty: i64, unit_cost_cents: i64) -> Self {
        Self {
            ean,
            name: name.into(),
            system_qty,
            counted_qty: None,
            unit_cost_cents: clamp_cost(unit_cost_cents),
            group: None,
        }
    }

    pub fn with_counted(mut self, counted_qty: i64) -> Self {
        self.counted_qty = Some(counted_qty);
        self
    }

    pub fn with_group(mut self, group: GroupTag) -> Self {
        self.group = Some(group);
        self
    }

    pub fn unit_cost_cents(&self) -> i64 {
        self.unit_cost_cents
    }

    pub fn set_unit_cost_cents(&mut self, unit_cost_cents: i64) {
        self.unit_cost_cents = clamp_cost(unit_cost_cents);
    }

    /// Recompute the variance for the current quantities.
    ///
    /// Returns `None` while the item is uncounted: unset counts are excluded
    /// from "no difference" tallies but must never panic.
    pub fn diff(&self) -> Option<Diff> {
        let counted = self.counted_qty?;
        let qty = counted - self.system_qty;
        Some(Diff {
            qty,
            value_cents: qty * self.unit_cost_cents,
        })
    }
}

fn clamp_cost(unit_cost_cents: i64) -> i64 {
    if unit_cost_cents < 0 {
        tracing::warn!(unit_cost_cents, "negative unit cost clamped to 0");
        0
    } else {
        unit_cost_cents
    }
}

/// Derived variance of one record: counted minus system, and its monetary
/// equivalent in smallest currency unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub qty: i64,
    pub value_cents: i64,
}

impl ValueObject for Diff {}
