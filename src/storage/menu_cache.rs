//! Process-wide catalog snapshot annotated with embeddings.
//!
//! The cache is initialized empty at startup and populated by `refresh()`,
//! which fetches the catalog, embeds every item text in one batch call, and
//! publishes the new snapshot with a single `Arc` swap. Readers always see
//! either the old or the new full snapshot, never a partial mix.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::internal::MenuItem;
use crate::services::catalog_client::{CatalogClient, CatalogError};
use crate::services::embedding_provider::{EmbeddingProvider, ProviderError};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Embedding error: {0}")]
    Embedding(#[from] ProviderError),
}

/// Immutable view of the cached catalog. Preserves catalog iteration order so
/// similarity ties break stably.
#[derive(Debug, Default)]
pub struct MenuSnapshot {
    items: Vec<MenuItem>,
    by_id: HashMap<String, usize>,
}

impl MenuSnapshot {
    pub(crate) fn new(items: Vec<MenuItem>) -> Self {
        let by_id = items
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.id.clone(), idx))
            .collect();
        Self { items, by_id }
    }

    pub fn get(&self, id: &str) -> Option<&MenuItem> {
        self.by_id.get(id).map(|&idx| &self.items[idx])
    }

    /// Items in catalog order.
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct MenuCache {
    inner: RwLock<Arc<MenuSnapshot>>,
    catalog: Arc<CatalogClient>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl MenuCache {
    pub fn new(catalog: Arc<CatalogClient>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            inner: RwLock::new(Arc::new(MenuSnapshot::default())),
            catalog,
            embedder,
        }
    }

    /// Rebuilds the cache from the upstream catalog.
    ///
    /// All item texts go to the embedding service in a single batch call; the
    /// response is order-preserving, so vector `i` belongs to item `i`. On any
    /// failure the previous snapshot stays published and the error is
    /// returned. Returns the number of cached items on success.
    pub async fn refresh(&self) -> Result<usize, CacheError> {
        let mut items = self.catalog.fetch_menu_items().await?;

        let texts: Vec<String> = items.iter().map(|i| i.embedding_text()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        for (item, vector) in items.iter_mut().zip(vectors) {
            item.embedding = vector;
        }

        let snapshot = Arc::new(MenuSnapshot::new(items));
        let count = snapshot.len();

        // Single swap: readers see the old snapshot or this one, nothing in
        // between.
        *self.inner.write().await = snapshot;

        info!(count, "menu cache refreshed");
        Ok(count)
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Current snapshot; cheap to clone and stable for the duration of a turn.
    pub async fn snapshot(&self) -> Arc<MenuSnapshot> {
        self.inner.read().await.clone()
    }

    /// Seeds the snapshot directly, bypassing upstream fetches.
    #[cfg(test)]
    pub(crate) async fn install(&self, items: Vec<MenuItem>) {
        *self.inner.write().await = Arc::new(MenuSnapshot::new(items));
    }
}
