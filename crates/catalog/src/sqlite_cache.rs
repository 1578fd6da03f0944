//! Persistent catalog cache backed by SQLite.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

use stocktake_core::Ean;

use crate::cache::CatalogCache;
use crate::catalog::CatalogEntry;

/// SQLite-backed catalog cache that survives process restarts.
///
/// Failures on the read path are logged and reported as a cache miss; the
/// read-through wrapper then falls back to the catalog, so a broken local
/// store never blocks validation.
#[derive(Debug, Clone)]
pub struct SqliteCache {
    /// Shared SQLite connection pool, lazily initialized on first use.
    pool: Arc<Mutex<Option<SqlitePool>>>,
    db_path: PathBuf,
}

impl SqliteCache {
    /// Cache at the default location: `{data_dir}/stocktake/cache.db`.
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            pool: Arc::new(Mutex::new(None)),
            db_path: cache_db_path()?,
        })
    }

    /// Cache at an explicit path (tests, portable installs).
    pub fn at_path(db_path: PathBuf) -> Self {
        Self {
            pool: Arc::new(Mutex::new(None)),
            db_path,
        }
    }

    async fn ensure_initialized(&self) -> anyhow::Result<()> {
        let mut pool_guard = self.pool.lock().await;
        if pool_guard.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create cache directory at {parent:?}"))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", self.db_path.to_string_lossy());
        let pool = SqlitePool::connect(&db_url)
            .await
            .with_context(|| format!("failed to open catalog cache at {:?}", self.db_path))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS catalog_entries (
                ean             TEXT NOT NULL PRIMARY KEY,
                name            TEXT NOT NULL,
                unit_cost_cents INTEGER NOT NULL,
                cached_at       TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create catalog_entries table")?;

        *pool_guard = Some(pool);
        Ok(())
    }

    async fn get_pool(&self) -> anyhow::Result<SqlitePool> {
        self.ensure_initialized().await?;
        let pool_guard = self.pool.lock().await;
        pool_guard
            .clone()
            .context("catalog cache pool missing after initialization")
    }

    async fn get_entry(&self, ean: &Ean) -> anyhow::Result<Option<CatalogEntry>> {
        let pool = self.get_pool().await?;

        let row = sqlx::query(
            r#"
            SELECT name, unit_cost_cents
            FROM catalog_entries
            WHERE ean = ?1
            "#,
        )
        .bind(ean.as_str())
        .fetch_optional(&pool)
        .await
        .context("failed to fetch catalog entry from cache")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(CatalogEntry {
            name: row.try_get("name")?,
            unit_cost_cents: row.try_get("unit_cost_cents")?,
        }))
    }

    async fn put_entry(&self, ean: &Ean, entry: &CatalogEntry) -> anyhow::Result<()> {
        let pool = self.get_pool().await?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO catalog_entries (ean, name, unit_cost_cents, cached_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(ean)
            DO UPDATE SET
                name = excluded.name,
                unit_cost_cents = excluded.unit_cost_cents,
                cached_at = excluded.cached_at
            "#,
        )
        .bind(ean.as_str())
        .bind(&entry.name)
        .bind(entry.unit_cost_cents)
        .bind(&now)
        .execute(&pool)
        .await
        .context("failed to upsert catalog entry in cache")?;

        Ok(())
    }
}

/// Drive one cache operation to completion on its own thread and runtime.
///
/// The sync trait methods are reached from async workers (the auto-save
/// validation path goes through the read-through wrapper), where blocking on
/// a runtime created inline panics. A dedicated thread is immune to the
/// caller's execution context.
fn run_isolated<T, Fut>(fut: Fut) -> anyhow::Result<T>
where
    T: Send + 'static,
    Fut: std::future::Future<Output = anyhow::Result<T>> + Send + 'static,
{
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build catalog cache runtime")?;
        rt.block_on(fut)
    })
    .join()
    .map_err(|_| anyhow!("catalog cache worker thread panicked"))?
}

impl CatalogCache for SqliteCache {
    fn get(&self, ean: &Ean) -> Option<CatalogEntry> {
        let cache = self.clone();
        let ean = ean.clone();
        match run_isolated(async move { cache.get_entry(&ean).await }) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::error!("failed to read catalog entry from cache: {err:?}");
                None
            }
        }
    }

    fn put(&self, ean: Ean, entry: CatalogEntry) {
        let cache = self.clone();
        if let Err(err) = run_isolated(async move { cache.put_entry(&ean, &entry).await }) {
            tracing::error!("failed to write catalog entry to cache: {err:?}");
        }
    }
}

/// Resolve the path to the SQLite cache database:
/// `{app_data_dir}/stocktake/cache.db`.
fn cache_db_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory")?;

    let mut dir = base;
    dir.push("stocktake");
    dir.push("cache.db");
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache(name: &str) -> SqliteCache {
        let mut path = std::env::temp_dir();
        path.push(format!("stocktake-cache-test-{}-{}.db", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        SqliteCache::at_path(path)
    }

    #[test]
    fn put_then_get_survives_a_new_handle() {
        let cache = temp_cache("roundtrip");
        let entry = CatalogEntry {
            name: "Paracetamol".to_string(),
            unit_cost_cents: 799,
        };
        cache.put(Ean::new("7891"), entry.clone());

        // A fresh handle over the same file sees the entry.
        let reopened = SqliteCache::at_path(cache.db_path.clone());
        assert_eq!(reopened.get(&Ean::new("7891")), Some(entry));
    }

    #[tokio::test]
    async fn cache_works_from_async_callers() {
        let cache = temp_cache("async");
        let entry = CatalogEntry {
            name: "Losartana".to_string(),
            unit_cost_cents: 1599,
        };
        cache.put(Ean::new("321"), entry.clone());
        assert_eq!(cache.get(&Ean::new("321")), Some(entry));
    }

    #[test]
    fn missing_entry_is_a_miss() {
        let cache = temp_cache("miss");
        assert_eq!(cache.get(&Ean::new("404")), None);
    }

    #[test]
    fn put_overwrites() {
        let cache = temp_cache("overwrite");
        let ean = Ean::new("555");
        cache.put(
            ean.clone(),
            CatalogEntry {
                name: "Old".into(),
                unit_cost_cents: 1,
            },
        );
        cache.put(
            ean.clone(),
            CatalogEntry {
                name: "New".into(),
                unit_cost_cents: 2,
            },
        );
        assert_eq!(cache.get(&ean).unwrap().unit_cost_cents, 2);
    }
}
