//! Category-aware randomized picker for when the guest hands over the choice.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::warn;

use crate::models::internal::MenuItem;
use crate::orchestrator::retrieval::cosine_similarity;
use crate::services::embedding_provider::EmbeddingProvider;
use crate::storage::menu_cache::MenuCache;

/// Focus label meaning "no category preference".
pub const ALL_CATEGORIES: &str = "all";
/// Focused picks shuffle within this many top-similarity items, trading a
/// little relevance for variety.
const FOCUS_SHORTLIST: usize = 10;

pub struct SurpriseSelector {
    cache: Arc<MenuCache>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SurpriseSelector {
    pub fn new(cache: Arc<MenuCache>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { cache, embedder }
    }

    /// Picks up to `qtd` items. Intentionally non-deterministic per call.
    ///
    /// Focus `"all"` shuffles the whole cache. A specific focus embeds the
    /// category label and shuffles within the top-similarity shortlist, so
    /// the pick stays topically relevant without any keyword matching. If the
    /// label embedding fails, the all-categories path takes over.
    pub async fn pick(&self, qtd: usize, category_focus: &str) -> Vec<MenuItem> {
        let snapshot = self.cache.snapshot().await;
        if snapshot.is_empty() {
            return Vec::new();
        }

        if category_focus.eq_ignore_ascii_case(ALL_CATEGORIES) {
            return shuffle_and_take(snapshot.items().to_vec(), qtd);
        }

        let label = category_focus.replace('_', " ");
        let focus_vector = match self.embedder.embed(&label).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "focus embedding failed, picking across all categories");
                return shuffle_and_take(snapshot.items().to_vec(), qtd);
            }
        };

        let mut scored: Vec<(f32, &MenuItem)> = snapshot
            .items()
            .iter()
            .map(|item| (cosine_similarity(&focus_vector, &item.embedding), item))
            .collect();
        // No floor here: even weak matches beat an empty surprise.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let shortlist: Vec<MenuItem> = scored
            .into_iter()
            .take(FOCUS_SHORTLIST)
            .map(|(_, item)| item.clone())
            .collect();

        shuffle_and_take(shortlist, qtd)
    }
}

fn shuffle_and_take(mut items: Vec<MenuItem>, qtd: usize) -> Vec<MenuItem> {
    items.shuffle(&mut rand::thread_rng());
    items.truncate(qtd);
    items
}
