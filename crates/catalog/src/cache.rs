use std::collections::HashMap;
use std::sync::Mutex;

use stocktake_core::Ean;

use crate::catalog::CatalogEntry;

/// Pluggable key→value cache in front of the catalog collaborator.
///
/// Explicit `get`/`put` interface so the store is swappable between an
/// in-memory map and a persistent local store without touching callers.
pub trait CatalogCache {
    fn get(&self, ean: &Ean) -> Option<CatalogEntry>;
    fn put(&self, ean: Ean, entry: CatalogEntry);
}

/// Process-local cache; discarded with the session.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<Ean, CatalogEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CatalogCache for InMemoryCache {
    fn get(&self, ean: &Ean) -> Option<CatalogEntry> {
        self.entries.lock().ok()?.get(ean).cloned()
    }

    fn put(&self, ean: Ean, entry: CatalogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(ean, entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = InMemoryCache::new();
        let entry = CatalogEntry {
            name: "Ibuprofen".to_string(),
            unit_cost_cents: 1250,
        };
        cache.put(Ean::new("789"), entry.clone());
        assert_eq!(cache.get(&Ean::new("789")), Some(entry));
        assert_eq!(cache.get(&Ean::new("404")), None);
    }

    #[test]
    fn put_overwrites_existing_entry() {
        let cache = InMemoryCache::new();
        let ean = Ean::new("789");
        cache.put(
            ean.clone(),
            CatalogEntry {
                name: "Old".to_string(),
                unit_cost_cents: 1,
            },
        );
        cache.put(
            ean.clone(),
            CatalogEntry {
                name: "New".to_string(),
                unit_cost_cents: 2,
            },
        );
        assert_eq!(cache.get(&ean).unwrap().name, "New");
        assert_eq!(cache.len(), 1);
    }
}
