//! Resolution of external search terms to canonical practice items.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use review_import_core::CanonicalItem;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::services::batch::BatchProcessor;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("resolution backend error: {0}")]
    Backend(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Batched term lookup provided by an external service.
#[async_trait]
pub trait ItemResolutionService: Send + Sync {
    /// Resolve a batch of terms. Terms absent from the map resolved to nothing.
    async fn resolve(
        &self,
        terms: &[String],
    ) -> Result<HashMap<String, Vec<CanonicalItem>>, ResolutionError>;
}

/// Process-lifetime cache of successfully resolved terms.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<String, Vec<CanonicalItem>>>,
    closed: AtomicBool,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, term: &str) -> Option<Vec<CanonicalItem>> {
        self.entries.read().await.get(term).cloned()
    }

    /// Store resolved terms. Ignored once the cache is closed.
    pub async fn insert_all(&self, resolved: &HashMap<String, Vec<CanonicalItem>>) {
        if self.is_closed() {
            return;
        }
        let mut entries = self.entries.write().await;
        for (term, items) in resolved {
            entries.insert(term.clone(), items.clone());
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Drop all entries and stop caching.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.entries.write().await.clear();
    }
}

/// Caching, batching front for an [`ItemResolutionService`].
pub struct ItemResolutionAdapter {
    service: Arc<dyn ItemResolutionService>,
    cache: Arc<ResolutionCache>,
    batches: BatchProcessor,
}

impl ItemResolutionAdapter {
    pub fn new(
        service: Arc<dyn ItemResolutionService>,
        cache: Arc<ResolutionCache>,
        batch_size: usize,
        max_concurrency: usize,
    ) -> Self {
        Self {
            service,
            cache,
            batches: BatchProcessor::new(batch_size, max_concurrency),
        }
    }

    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    /// Resolve every term to zero or more canonical items.
    ///
    /// Never fails: terms in a failed lookup batch resolve to nothing.
    pub async fn resolve_batch(&self, terms: &[String]) -> HashMap<String, Vec<CanonicalItem>> {
        let mut resolved = HashMap::with_capacity(terms.len());
        let mut misses = Vec::new();
        let mut seen = HashSet::new();

        for term in terms {
            if !seen.insert(term.as_str()) {
                continue;
            }
            match self.cache.get(term).await {
                Some(items) => {
                    resolved.insert(term.clone(), items);
                }
                None => misses.push(term.clone()),
            }
        }

        let hits = resolved.len();
        if !misses.is_empty() {
            let fetched = self
                .batches
                .run_resilient(misses.clone(), "item-resolution", |_, batch| self.lookup(batch))
                .await;
            for batch in fetched {
                resolved.extend(batch);
            }
        }

        let mut failed = 0;
        for term in &misses {
            if !resolved.contains_key(term) {
                failed += 1;
                resolved.insert(term.clone(), Vec::new());
            }
        }

        tracing::info!(
            terms = seen.len(),
            cache_hits = hits,
            looked_up = misses.len(),
            failed,
            "resolved search terms"
        );
        resolved
    }

    async fn lookup(
        &self,
        batch: Vec<String>,
    ) -> Result<HashMap<String, Vec<CanonicalItem>>, ResolutionError> {
        let mut response = self.service.resolve(&batch).await?;

        let resolved: HashMap<String, Vec<CanonicalItem>> = batch
            .into_iter()
            .map(|term| {
                let items = response.remove(&term).map(unique_items).unwrap_or_default();
                (term, items)
            })
            .collect();

        self.cache.insert_all(&resolved).await;
        Ok(resolved)
    }
}

/// Drop repeated (type, key) pairs, keeping first occurrence order.
fn unique_items(items: Vec<CanonicalItem>) -> Vec<CanonicalItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert((item.item_type, item.key.clone())))
        .collect()
}
