use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stocktake_core::{BranchId, DomainError, DomainResult, Ean, GroupTag};

use crate::cyclic::{AnomalySeverity, CountStatus, CyclicItem};
use crate::record::InventoryRecord;

/// Adjustment document references required by [`CountSheet::finalize`].
///
/// A shortage anywhere in the controlled set requires `shortage_id`; a
/// surplus requires `surplus_id`. Either may be omitted when the matching
/// direction of variance is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeAdjustments {
    pub shortage_id: Option<String>,
    pub surplus_id: Option<String>,
}

impl FinalizeAdjustments {
    fn shortage_ref(&self) -> Option<&str> {
        self.shortage_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn surplus_ref(&self) -> Option<&str> {
        self.surplus_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Owned collection of cyclic items for one branch+group editing session.
///
/// Items live in a `Vec` in stable insertion order; a hash index keyed by
/// normalized EAN gives O(1) lookups so merge/validate passes never degrade
/// to nested scans. Mutation is direct and explicit; views at API boundaries
/// are returned by value or as slices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SheetRepr")]
pub struct CountSheet {
    branch: BranchId,
    group: GroupTag,
    items: Vec<CyclicItem>,
    #[serde(skip)]
    index: HashMap<Ean, usize>,
    shortage_adjustment: Option<String>,
    surplus_adjustment: Option<String>,
}

impl CountSheet {
    pub fn new(branch: BranchId, group: GroupTag) -> Self {
        Self {
            branch,
            group,
            items: Vec::new(),
            index: HashMap::new(),
            shortage_adjustment: None,
            surplus_adjustment: None,
        }
    }

    /// Build a sheet from imported records; every item starts `pending`.
    pub fn from_records(
        branch: BranchId,
        group: GroupTag,
        records: impl IntoIterator<Item = InventoryRecord>,
    ) -> Self {
        let mut sheet = Self::new(branch, group);
        for record in records {
            sheet.upsert(CyclicItem::new(record));
        }
        sheet
    }

    pub fn branch(&self) -> BranchId {
        self.branch
    }

    pub fn group(&self) -> &GroupTag {
        &self.group
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[CyclicItem] {
        &self.items
    }

    pub fn get(&self, ean: &Ean) -> Option<&CyclicItem> {
        self.index.get(ean).map(|&i| &self.items[i])
    }

    /// Insert an item, replacing any existing item with the same EAN.
    /// Returns the replaced item, if any.
    pub fn upsert(&mut self, item: CyclicItem) -> Option<CyclicItem> {
        match self.index.get(&item.record.ean) {
            Some(&i) => Some(std::mem::replace(&mut self.items[i], item)),
            None => {
                self.index.insert(item.record.ean.clone(), self.items.len());
                self.items.push(item);
                None
            }
        }
    }

    /// Rebuild the EAN index from the item vector. The index is derived
    /// state: it is never serialized, and deserialization rebuilds it.
    fn reindex(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(i, it)| (it.record.ean.clone(), i))
            .collect();
    }

    pub fn confirm(&mut self, ean: &Ean) -> DomainResult<()> {
        self.item_mut(ean)?.confirm()
    }

    pub fn set_quantity(&mut self, ean: &Ean, qty: i64) -> DomainResult<AnomalySeverity> {
        self.item_mut(ean)?.set_quantity(qty)
    }

    pub fn revert(&mut self, ean: &Ean) -> DomainResult<()> {
        self.item_mut(ean)?.revert()
    }

    /// Bulk-finalize every `controlled` item into `adjusted`, atomically.
    ///
    /// Guard phase first: a shortage in the controlled set requires a
    /// non-empty shortage adjustment reference, a surplus requires a surplus
    /// reference. Any guard failure leaves the sheet untouched — the
    /// transition never commits partially. Returns how many items moved.
    pub fn finalize(&mut self, adjustments: &FinalizeAdjustments) -> DomainResult<usize> {
        let controlled: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, it)| it.status() == CountStatus::Controlled)
            .map(|(i, _)| i)
            .collect();

        if controlled.is_empty() {
            return Err(DomainError::invariant("no controlled items to finalize"));
        }

        let has_shortage = controlled
            .iter()
            .filter_map(|&i| self.items[i].record.diff())
            .any(|d| d.qty < 0);
        let has_surplus = controlled
            .iter()
            .filter_map(|&i| self.items[i].record.diff())
            .any(|d| d.qty > 0);

        if has_shortage && adjustments.shortage_ref().is_none() {
            return Err(DomainError::validation(
                "shortage adjustment identifier is required",
            ));
        }
        if has_surplus && adjustments.surplus_ref().is_none() {
            return Err(DomainError::validation(
                "surplus adjustment identifier is required",
            ));
        }

        for &i in &controlled {
            self.items[i].mark_adjusted();
        }
        if let Some(id) = adjustments.shortage_ref() {
            self.shortage_adjustment = Some(id.to_string());
        }
        if let Some(id) = adjustments.surplus_ref() {
            self.surplus_adjustment = Some(id.to_string());
        }

        tracing::info!(
            branch = %self.branch,
            group = %self.group,
            adjusted = controlled.len(),
            "finalized controlled items"
        );
        Ok(controlled.len())
    }

    pub fn shortage_adjustment(&self) -> Option<&str> {
        self.shortage_adjustment.as_deref()
    }

    pub fn surplus_adjustment(&self) -> Option<&str> {
        self.surplus_adjustment.as_deref()
    }

    fn item_mut(&mut self, ean: &Ean) -> DomainResult<&mut CyclicItem> {
        let &i = self.index.get(ean).ok_or(DomainError::NotFound)?;
        Ok(&mut self.items[i])
    }
}

/// Wire shape of a sheet. Deserializing through it means a restored sheet is
/// immediately usable: the EAN index is rebuilt on the way in.
#[derive(Deserialize)]
struct SheetRepr {
    branch: BranchId,
    group: GroupTag,
    items: Vec<CyclicItem>,
    shortage_adjustment: Option<String>,
    surplus_adjustment: Option<String>,
}

impl From<SheetRepr> for CountSheet {
    fn from(repr: SheetRepr) -> Self {
        let mut sheet = Self {
            branch: repr.branch,
            group: repr.group,
            items: repr.items,
            index: HashMap::new(),
            shortage_adjustment: repr.shortage_adjustment,
            surplus_adjustment: repr.surplus_adjustment,
        };
        sheet.reindex();
        sheet
    }
}
