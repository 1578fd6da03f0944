use std::future::Future;

use thiserror::Error;

use stocktake_core::{BranchId, GroupTag};
use stocktake_records::CyclicItem;

/// Persistence-layer failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// Retryable (network hiccup, lock contention).
    #[error("transient persistence failure: {0}")]
    Transient(String),

    /// Not worth retrying (schema mismatch, rejected write).
    #[error("persistence failure: {0}")]
    Terminal(String),
}

/// Remote store for count batches.
///
/// The write path is **replace-per-group**: the store deletes every row for
/// the branch+group key and bulk-inserts the batch. Every save is a
/// full-state overwrite — two sessions editing the same group concurrently
/// will each overwrite the other's last write (a known, documented race; no
/// cross-session merge exists).
pub trait CountStore: Send + Sync + 'static {
    fn replace_group(
        &self,
        branch: BranchId,
        group: &GroupTag,
        batch: &[CyclicItem],
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}
