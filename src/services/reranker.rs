//! Precision-stage reranker contract.
//!
//! Vector search is the coarse recall stage; this collaborator judges which
//! of the at-most-25 candidates genuinely fit the request and returns 0-3
//! IDs. Empty output is a meaningful answer, not an error. The two stages
//! stay separate by design.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RerankError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Candidate view handed to the reranker: just enough to judge relevance.
#[derive(Debug, Clone, Serialize)]
pub struct RerankCandidate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Returns the chosen candidate IDs in preference order. IDs outside the
    /// candidate set are a contract violation; callers drop them silently.
    async fn rerank(
        &self,
        request: &str,
        candidates: &[RerankCandidate],
    ) -> Result<Vec<String>, RerankError>;
}

/// Accepted field names for the ID array when the reranker answers with an
/// object instead of a bare array. Checked in order; anything else is a parse
/// failure, not a guess.
const ID_FIELD_ALIASES: [&str; 5] = ["ids", "items", "recommended", "recommended_ids", "result"];

const RERANK_TIMEOUT: Duration = Duration::from_secs(20);

const RERANK_SYSTEM_PROMPT: &str = "\
You are a strict gastronomic curator. From the candidate list, select the \
items that genuinely satisfy the user's request.

Rules:
1. Answer ONLY with a JSON array of candidate ID strings, e.g. [\"id1\", \"id2\"].
2. Select 0 to 3 items. If nothing fits, answer [].
3. BE STRICT.
   - \"Something light\" -> only salads, fish, light grills or light starters. \
Never heavy pasta, fried food, fatty meat.
   - \"Sweet\" -> only desserts, cakes, chocolate. Never savory dishes.
   - \"Meat\" -> only red meat. Chicken and fish only if asked for white meat \
or nothing else fits.
4. A generic request (\"I'm hungry\") allows flexibility.
5. Never invent reasons. An empty list beats a bad recommendation.";

/// LLM-backed reranker over an OpenAI-style chat endpoint.
pub struct LlmReranker {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmReranker {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Reranker for LlmReranker {
    async fn rerank(
        &self,
        request: &str,
        candidates: &[RerankCandidate],
    ) -> Result<Vec<String>, RerankError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let candidate_lines: String = candidates
            .iter()
            .map(|c| {
                format!(
                    "- ID: {} | Name: {} | Desc: {} | Cat: {}\n",
                    c.id, c.name, c.description, c.category
                )
            })
            .collect();

        let user_prompt = format!(
            "User request: \"{request}\"\n\nCandidates (vector search):\n{candidate_lines}\n\
             Which of these genuinely satisfy the request? Answer with a JSON array of IDs."
        );

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": RERANK_SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt },
            ],
            "temperature": 0.0,
            "response_format": { "type": "json_object" },
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(RERANK_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| RerankError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RerankError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let completion: RerankCompletion = response
            .json()
            .await
            .map_err(|e| RerankError::Http(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RerankError::InvalidResponse("no content".to_string()))?;

        let parsed: Value = serde_json::from_str(&content)
            .map_err(|e| RerankError::InvalidResponse(e.to_string()))?;

        parse_id_list(&parsed)
    }
}

/// Extracts the ID array from a reranker reply: a top-level array, or an
/// object carrying one of `ID_FIELD_ALIASES`.
pub fn parse_id_list(value: &Value) -> Result<Vec<String>, RerankError> {
    let array = match value {
        Value::Array(array) => array,
        Value::Object(map) => ID_FIELD_ALIASES
            .iter()
            .find_map(|alias| map.get(*alias).and_then(Value::as_array))
            .ok_or_else(|| {
                RerankError::InvalidResponse(format!(
                    "no ID array under any of {ID_FIELD_ALIASES:?}"
                ))
            })?,
        _ => {
            return Err(RerankError::InvalidResponse(
                "neither array nor object".to_string(),
            ))
        }
    };

    Ok(array
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect())
}

// ==================== Wire DTOs ====================

#[derive(Deserialize)]
struct RerankCompletion {
    choices: Vec<RerankChoice>,
}

#[derive(Deserialize)]
struct RerankChoice {
    message: RerankMessage,
}

#[derive(Deserialize)]
struct RerankMessage {
    content: Option<String>,
}
