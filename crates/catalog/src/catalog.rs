use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stocktake_core::{Ean, ValueObject};

use crate::cache::CatalogCache;

/// Reference data the catalog holds for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    /// Unit cost in smallest currency unit.
    pub unit_cost_cents: i64,
}

impl ValueObject for CatalogEntry {}

/// External product catalog.
///
/// Lookups are **batched**: callers pass every identifier they need at once
/// so an implementation can resolve them in a single remote round trip.
/// Absent identifiers are simply missing from the returned map.
pub trait Catalog {
    fn resolve_batch(&self, eans: &[Ean]) -> anyhow::Result<HashMap<Ean, CatalogEntry>>;
}

/// Read-through cache in front of a catalog.
///
/// Hits are served from the cache; only the misses go to the inner catalog in
/// one batch, and newly resolved entries are written back. An identifier the
/// inner catalog does not know stays uncached, so it is re-asked next time.
pub struct CachedCatalog<C, K> {
    inner: C,
    cache: K,
}

impl<C: Catalog, K: CatalogCache> CachedCatalog<C, K> {
    pub fn new(inner: C, cache: K) -> Self {
        Self { inner, cache }
    }
}

impl<C: Catalog, K: CatalogCache> Catalog for CachedCatalog<C, K> {
    fn resolve_batch(&self, eans: &[Ean]) -> anyhow::Result<HashMap<Ean, CatalogEntry>> {
        let mut resolved = HashMap::with_capacity(eans.len());
        let mut misses = Vec::new();

        for ean in eans {
            match self.cache.get(ean) {
                Some(entry) => {
                    resolved.insert(ean.clone(), entry);
                }
                None => misses.push(ean.clone()),
            }
        }

        if !misses.is_empty() {
            tracing::debug!(hits = resolved.len(), misses = misses.len(), "catalog lookup");
            let fetched = self.inner.resolve_batch(&misses)?;
            for (ean, entry) in fetched {
                self.cache.put(ean.clone(), entry.clone());
                resolved.insert(ean, entry);
            }
        }

        Ok(resolved)
    }
}
