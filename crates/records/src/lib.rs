//! `stocktake-records` — counted-item model and lifecycle.
//!
//! Record model with derived difference computation, the cyclic counting
//! state machine (`pending → controlled → adjusted`), anomaly classification
//! on edits, and the owned per-group `CountSheet` collection.

pub mod cyclic;
pub mod record;
pub mod sheet;

pub use cyclic::{AnomalySeverity, CountStatus, CyclicItem};
pub use record::{Diff, InventoryRecord};
pub use sheet::{CountSheet, FinalizeAdjustments};
