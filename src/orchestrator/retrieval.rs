//! Coarse recall over the embedding cache plus the rerank precision pass.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::internal::MenuItem;
use crate::services::embedding_provider::{EmbeddingProvider, ProviderError};
use crate::services::reranker::{RerankCandidate, Reranker};
use crate::storage::menu_cache::MenuCache;

/// Similarity noise floor; scores at or below it are discarded.
pub const SIMILARITY_FLOOR: f32 = 0.15;
/// Size of the pool handed to the reranker.
pub const CANDIDATE_POOL_SIZE: usize = 25;
/// How many similarity-ordered items stand in when the reranker fails.
pub const RERANK_FALLBACK_COUNT: usize = 3;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Query embedding failed: {0}")]
    QueryEmbedding(#[from] ProviderError),
}

/// `sim = dot(a,b) / (‖a‖·‖b‖)`. Zero-magnitude input scores 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Transient scoring pair; lives only inside one retrieval call.
struct CandidateScore<'a> {
    similarity: f32,
    item: &'a MenuItem,
}

pub struct MenuRetriever {
    cache: Arc<MenuCache>,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Arc<dyn Reranker>,
}

impl MenuRetriever {
    pub fn new(
        cache: Arc<MenuCache>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Arc<dyn Reranker>,
    ) -> Self {
        Self {
            cache,
            embedder,
            reranker,
        }
    }

    /// Coarse recall: similarity-ordered top candidates for `query`, minus
    /// the exclusion set.
    pub async fn candidate_pool(
        &self,
        query: &str,
        excluded: &HashSet<String>,
    ) -> Result<Vec<MenuItem>, RetrievalError> {
        let snapshot = self.cache.snapshot().await;
        if snapshot.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;

        let mut scored: Vec<CandidateScore<'_>> = snapshot
            .items()
            .iter()
            .filter(|item| !excluded.contains(&item.id))
            .filter_map(|item| {
                let similarity = cosine_similarity(&query_vector, &item.embedding);
                // Strictly above the floor; boundary ties are noise.
                (similarity > SIMILARITY_FLOOR).then_some(CandidateScore { similarity, item })
            })
            .collect();

        // Stable sort: equal scores keep catalog order.
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(scored
            .into_iter()
            .take(CANDIDATE_POOL_SIZE)
            .map(|c| c.item.clone())
            .collect())
    }

    /// Full pipeline: recall, rerank, fallback.
    ///
    /// The category focus only shapes the query text — relevance stays
    /// delegated to vector similarity, never to substring matching. The raw
    /// `request` goes to the reranker untouched.
    pub async fn recommend(
        &self,
        request: &str,
        category_focus: Option<&str>,
        excluded: &HashSet<String>,
    ) -> Vec<MenuItem> {
        let query = match category_focus {
            Some(focus) if !focus.is_empty() && !focus.eq_ignore_ascii_case("all") => {
                format!("{request} (category: {})", focus.replace('_', " "))
            }
            _ => request.to_string(),
        };

        let pool = match self.candidate_pool(&query, excluded).await {
            Ok(pool) => pool,
            Err(e) => {
                warn!(error = %e, "retrieval degraded to empty pool");
                return Vec::new();
            }
        };
        if pool.is_empty() {
            debug!("empty candidate pool for request");
            return Vec::new();
        }

        let candidates: Vec<RerankCandidate> = pool
            .iter()
            .map(|item| RerankCandidate {
                id: item.id.clone(),
                name: item.name.clone(),
                description: item.description.clone(),
                category: item.category.clone(),
            })
            .collect();

        match self.reranker.rerank(request, &candidates).await {
            Ok(ids) => {
                // IDs outside the pool are a contract violation, dropped
                // silently. An empty (but well-formed) answer means nothing
                // fits; that stands.
                let mut seen = HashSet::new();
                ids.into_iter()
                    .filter(|id| seen.insert(id.clone()))
                    .filter_map(|id| pool.iter().find(|item| item.id == id).cloned())
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, "reranker failed, falling back to similarity order");
                pool.into_iter().take(RERANK_FALLBACK_COUNT).collect()
            }
        }
    }
}
