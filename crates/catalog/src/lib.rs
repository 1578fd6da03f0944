//! `stocktake-catalog` — product catalog collaborator and read-through cache.
//!
//! The catalog resolves identifiers to `{name, cost}` reference data. It is
//! consumed as an external service; this crate defines the trait, a pluggable
//! `get`/`put` cache interface, an in-memory cache, a persistent SQLite-backed
//! cache, and a read-through wrapper combining a cache with a catalog.

pub mod cache;
pub mod catalog;
pub mod sqlite_cache;

pub use cache::{CatalogCache, InMemoryCache};
pub use catalog::{CachedCatalog, Catalog, CatalogEntry};
pub use sqlite_cache::SqliteCache;
