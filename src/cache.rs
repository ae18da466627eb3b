//! Key→id memoization shared by ingest and query workers.
//!
//! Two namespaces: word→keyword_id and host→domain_id. Rows are written to
//! the database before the cache, so a hit always implies the row exists.
//! Deletions never happen in practice, so staleness is a non-issue.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::repository::{DbContext, Result};

/// One cache namespace.
#[derive(Debug, Default)]
pub struct IdCache {
    map: RwLock<HashMap<String, i64>>,
}

impl IdCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id if known.
    pub fn resolve(&self, key: &str) -> Option<i64> {
        self.map.read().ok()?.get(key).copied()
    }

    /// Write-through from any component that just fetched or created the row.
    pub fn put(&self, key: &str, id: i64) {
        if let Ok(mut map) = self.map.write() {
            map.insert(key.to_string(), id);
        }
    }

    pub fn len(&self) -> usize {
        self.map.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Both namespaces, cloned freely between workers.
#[derive(Clone, Default)]
pub struct Caches {
    pub keywords: Arc<IdCache>,
    pub domains: Arc<IdCache>,
}

impl Caches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every keyword row into the keyword cache.
    pub async fn warm_keywords(&self, ctx: &DbContext) -> Result<usize> {
        let rows = ctx.keywords().all().await?;
        let total = rows.len();
        for (word, id) in rows {
            self.keywords.put(&word, id);
        }
        tracing::info!("Cached {} keywords", total);
        Ok(total)
    }

    /// Load every domain row into the domain cache.
    pub async fn warm_domains(&self, ctx: &DbContext) -> Result<usize> {
        let rows = ctx.articles().all_domains().await?;
        let total = rows.len();
        for (key, id) in rows {
            self.domains.put(&key, id);
        }
        tracing::info!("Cached {} domains", total);
        Ok(total)
    }
}
