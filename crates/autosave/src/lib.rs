//! `stocktake-autosave` — debounced, rate-limited, validated persistence.
//!
//! One coordinator per editing session. Edits are persisted at whole-batch
//! granularity (the persistence collaborator replaces the full branch+group
//! record set on every write), debounced over a quiet window, rate-limited
//! between write starts, validated before every write, and retried with
//! linear backoff on transient failures.

pub mod coordinator;
pub mod persistence;
pub mod validator;

pub use coordinator::{AutoSaveCoordinator, SaveState, SaveStatus};
pub use persistence::{CountStore, PersistenceError};
pub use validator::{CatalogValidator, SaveValidator};
