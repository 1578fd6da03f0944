//! `stocktake-observability` — tracing/logging wiring.

pub mod tracing;

pub use crate::tracing::init;
