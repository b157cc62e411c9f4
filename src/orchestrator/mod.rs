pub mod memory;
pub mod retrieval;
pub mod surprise;
pub mod upsell;

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::models::internal::{Suggestion, UpsellData};
use crate::models::message::{ConversationMessage, RequestPart, ResponsePart};
use crate::services::chat_model::{ChatModel, ChatModelError, ModelTurn, ToolCallRequest, ToolSpec};
use crate::services::embedding_provider::EmbeddingProvider;
use crate::services::reranker::Reranker;
use crate::storage::menu_cache::MenuCache;
use crate::storage::session_store::SessionStore;

use memory::ConversationMemory;
use retrieval::MenuRetriever;
use surprise::{SurpriseSelector, ALL_CATEGORIES};
use upsell::UpsellResolver;

/// The model gets this many tool rounds before the turn is abandoned.
pub const MAX_TOOL_ROUNDS: usize = 3;
/// Items handed back by the surprise tool.
pub const SURPRISE_COUNT: usize = 3;

const SEARCH_TOOL: &str = "search_menu";
const SURPRISE_TOOL: &str = "surprise_me";

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("empty user message")]
    EmptyMessage,
    #[error("chat model error: {0}")]
    Model(#[from] ChatModelError),
    #[error("model produced no final reply within {MAX_TOOL_ROUNDS} tool rounds")]
    NoFinalReply,
}

/// Everything a turn hands back to the transport layer.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: String,
    pub reply: String,
    pub recommended_ids: Vec<String>,
    pub upsell: Option<UpsellData>,
}

pub struct ChatOrchestrator {
    cache: Arc<MenuCache>,
    retriever: MenuRetriever,
    surprise: SurpriseSelector,
    memory: ConversationMemory,
    model: Arc<dyn ChatModel>,
    /// Rendered category tree embedded in the system prompt.
    categories: RwLock<String>,
}

impl ChatOrchestrator {
    pub fn new(
        cache: Arc<MenuCache>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Arc<dyn Reranker>,
        model: Arc<dyn ChatModel>,
        store: Arc<dyn SessionStore>,
        session_namespace: String,
    ) -> Self {
        Self {
            retriever: MenuRetriever::new(cache.clone(), embedder.clone(), reranker),
            surprise: SurpriseSelector::new(cache.clone(), embedder),
            memory: ConversationMemory::new(store, session_namespace),
            cache,
            model,
            categories: RwLock::new(String::new()),
        }
    }

    pub async fn set_categories(&self, rendered: String) {
        *self.categories.write().await = rendered;
    }

    /// Runs one conversational turn: load history, drive the model through
    /// its bounded tool loop, resolve the upsell, persist the new messages.
    ///
    /// Two concurrent turns on the same session can interleave their
    /// load/save cycles; the last writer wins. Accepted limitation, not
    /// guarded by a lock.
    pub async fn run_turn(&self, session_id: &str, user_text: &str) -> Result<TurnOutcome, TurnError> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let history = self.memory.load(session_id).await;
        let system_prompt = build_system_prompt(&self.categories.read().await);
        let tools = tool_specs();

        let mut new_messages = vec![ConversationMessage::user_text(user_text)];
        let mut final_reply = None;

        for _round in 0..=MAX_TOOL_ROUNDS {
            let mut transcript = history.clone();
            transcript.extend(new_messages.iter().cloned());

            match self.model.complete(&system_prompt, &transcript, &tools).await? {
                ModelTurn::Final(reply) => {
                    final_reply = Some(reply);
                    break;
                }
                ModelTurn::ToolCalls(calls) => {
                    // The tool-call response and the request carrying its
                    // results are appended adjacently; memory truncation
                    // relies on that pairing.
                    new_messages.push(ConversationMessage::Response {
                        parts: calls
                            .iter()
                            .map(|call| ResponsePart::ToolCall {
                                call_id: call.call_id.clone(),
                                tool_name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            })
                            .collect(),
                    });

                    let mut result_parts = Vec::with_capacity(calls.len());
                    for call in &calls {
                        let content = self.dispatch_tool(call).await;
                        result_parts.push(RequestPart::ToolResult {
                            call_id: call.call_id.clone(),
                            tool_name: call.name.clone(),
                            content,
                        });
                    }
                    new_messages.push(ConversationMessage::Request {
                        parts: result_parts,
                    });
                }
            }
        }

        let reply = final_reply.ok_or(TurnError::NoFinalReply)?;

        let snapshot = self.cache.snapshot().await;
        let upsell = UpsellResolver::resolve(&reply.recommended_ids, &snapshot);

        new_messages.push(ConversationMessage::assistant_text(&reply.reply));
        if let Some(data) = &upsell {
            // Keep the offer in context so a plain "yes" next turn has its
            // antecedent.
            new_messages.push(ConversationMessage::assistant_text(&data.message));
        }

        if let Err(e) = self.memory.save(session_id, new_messages).await {
            warn!(error = %e, session_id, "failed to persist session history");
        }

        Ok(TurnOutcome {
            session_id: session_id.to_string(),
            reply: reply.reply,
            recommended_ids: reply.recommended_ids,
            upsell,
        })
    }

    async fn dispatch_tool(&self, call: &ToolCallRequest) -> Value {
        // First use of the catalog in this process triggers the lazy warmup;
        // failure degrades to an empty pool rather than failing the turn.
        if self.cache.is_empty().await {
            match self.cache.refresh().await {
                Ok(count) => info!(count, "lazy menu cache refresh"),
                Err(e) => warn!(error = %e, "lazy menu cache refresh failed"),
            }
        }

        match call.name.as_str() {
            SEARCH_TOOL => {
                let args: SearchArgs =
                    serde_json::from_value(call.arguments.clone()).unwrap_or_default();
                let excluded: HashSet<String> = args.excluded_ids.into_iter().collect();
                let items = self
                    .retriever
                    .recommend(&args.request, args.category_focus.as_deref(), &excluded)
                    .await;
                suggestions_payload(items.iter().map(Suggestion::from).collect())
            }
            SURPRISE_TOOL => {
                let args: SurpriseArgs =
                    serde_json::from_value(call.arguments.clone()).unwrap_or_default();
                let focus = args
                    .category_focus
                    .unwrap_or_else(|| ALL_CATEGORIES.to_string());
                let items = self.surprise.pick(SURPRISE_COUNT, &focus).await;
                suggestions_payload(items.iter().map(Suggestion::from).collect())
            }
            other => {
                warn!(tool = other, "model requested an unknown tool");
                json!({ "error": format!("unknown tool: {other}") })
            }
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct SearchArgs {
    #[serde(default)]
    request: String,
    #[serde(default)]
    category_focus: Option<String>,
    #[serde(default)]
    excluded_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SurpriseArgs {
    #[serde(default)]
    category_focus: Option<String>,
}

fn suggestions_payload(suggestions: Vec<Suggestion>) -> Value {
    json!({ "suggestions": suggestions })
}

fn build_system_prompt(categories: &str) -> String {
    let categories = if categories.is_empty() {
        "(not loaded yet)"
    } else {
        categories
    };
    format!(
        "You are a warm, knowledgeable restaurant host helping a guest choose \
         from the menu.\n\n\
         Today is {date}.\n\n\
         Menu categories:\n{categories}\n\n\
         Guidelines:\n\
         1. Call `{SEARCH_TOOL}` only when the guest expresses a concrete wish \
         (\"I want X\", \"do you have Y?\"). Put previously rejected item IDs \
         in `excluded_ids`.\n\
         2. Call `{SURPRISE_TOOL}` only when the guest explicitly hands over \
         the choice (\"you pick\", \"surprise me\", \"anything works\").\n\
         3. Greetings and small talk get a friendly reply naming the \
         categories above; no tools.\n\
         4. Call at most one tool per guest message. The result is \
         sufficient; never call again to refine it.\n\
         5. Always answer with a JSON object: \
         {{\"reply\": \"<conversational answer>\", \"recommended_ids\": \
         [\"<item ids>\"]}}. Use IDs from tool results only; empty array when \
         recommending nothing.",
        date = chrono::Utc::now().format("%Y-%m-%d"),
    )
}

fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: SEARCH_TOOL.to_string(),
            description: "Search the menu for items matching the guest's \
                          concrete wish. Use only for clear purchase intent."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "request": {
                        "type": "string",
                        "description": "The guest's wish, extracted from the conversation."
                    },
                    "category_focus": {
                        "type": "string",
                        "description": "Category to lean towards, or \"all\"."
                    },
                    "excluded_ids": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "IDs already suggested and rejected."
                    }
                },
                "required": ["request"]
            }),
        },
        ToolSpec {
            name: SURPRISE_TOOL.to_string(),
            description: "Pick random menu items when the guest explicitly \
                          gives up choosing."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "category_focus": {
                        "type": "string",
                        "description": "Category to stay within, or \"all\"."
                    }
                }
            }),
        },
    ]
}
