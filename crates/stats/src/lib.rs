//! `stocktake-stats` — progress and variance rollups for dashboards.
//!
//! Reduces item-level state into per-group and per-branch metrics. Reads the
//! record model only; derived figures are recomputed here, never read from a
//! cache.

pub mod reducer;

pub use reducer::{
    reduce_branch, reduce_group, BranchStats, FixedGoal, GroupGoalSource, GroupStats, GroupStatus,
};
