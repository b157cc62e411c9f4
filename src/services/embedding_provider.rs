//! Embedding generation with provider abstraction.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Provider-specific errors
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("No embeddings returned")]
    NoEmbeddings,
    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Trait for embedding providers (OpenAI-compatible endpoints, mocks).
///
/// `embed_batch` must be order-preserving: vector `i` of the result belongs
/// to input text `i`. The cache build relies on this to re-associate vectors
/// with items.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

const EMBED_TIMEOUT: Duration = Duration::from_secs(30);
// Batch payloads are larger; give them more room.
const EMBED_BATCH_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI-style `/v1/embeddings` provider.
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingProvider {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    async fn request_embeddings(
        &self,
        texts: &[String],
        timeout: Duration,
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, message });
        }

        let body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if body.data.is_empty() {
            return Err(ProviderError::NoEmbeddings);
        }

        // Response order matches input order; count must match too.
        if body.data.len() != texts.len() {
            warn!(
                expected = texts.len(),
                got = body.data.len(),
                "embedding batch count mismatch"
            );
            return Err(ProviderError::CountMismatch {
                expected: texts.len(),
                actual: body.data.len(),
            });
        }

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let input = vec![text.replace('\n', " ")];
        let mut vectors = self.request_embeddings(&input, EMBED_TIMEOUT).await?;
        Ok(vectors.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            debug!("embed_batch called with no texts, skipping");
            return Ok(vec![]);
        }
        self.request_embeddings(texts, EMBED_BATCH_TIMEOUT).await
    }
}

/// Mock provider for testing
pub struct MockProvider {
    response: Result<Vec<f32>, ProviderError>,
    pub call_count: std::sync::Arc<std::sync::Mutex<usize>>,
}

impl MockProvider {
    /// Mock that returns the same embedding for every input.
    pub fn new_success(embedding: Vec<f32>) -> Self {
        Self {
            response: Ok(embedding),
            call_count: std::sync::Arc::new(std::sync::Mutex::new(0)),
        }
    }

    /// Mock that returns an error for every input.
    pub fn new_error(error: ProviderError) -> Self {
        Self {
            response: Err(error),
            call_count: std::sync::Arc::new(std::sync::Mutex::new(0)),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        self.response.clone()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        match &self.response {
            Ok(vec) => Ok(texts.iter().map(|_| vec.clone()).collect()),
            Err(err) => Err(err.clone()),
        }
    }
}
