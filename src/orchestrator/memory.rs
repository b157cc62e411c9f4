//! Per-session conversation memory with pairing-safe truncation.
//!
//! Naive fixed-window truncation can cut between a tool-call response and
//! the request carrying its tool result, and the downstream model provider
//! rejects such a history outright. The truncation here never separates that
//! pair, and `load` self-heals stored state that already starts mid
//! tool-exchange.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::models::message::ConversationMessage;
use crate::storage::session_store::{SessionStore, SessionStoreError};

/// Retained history length; truncation may keep more to protect a pair.
pub const MAX_MESSAGES: usize = 8;
/// Session expiry, refreshed on every save.
pub const SESSION_TTL: Duration = Duration::from_secs(86_400);

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Session store error: {0}")]
    Store(#[from] SessionStoreError),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct ConversationMemory {
    store: Arc<dyn SessionStore>,
    namespace: String,
}

impl ConversationMemory {
    pub fn new(store: Arc<dyn SessionStore>, namespace: String) -> Self {
        Self { store, namespace }
    }

    fn session_key(&self, session_id: &str) -> String {
        format!("{}:chat:{}", self.namespace, session_id)
    }

    /// Returns the stored history, or empty when absent, expired,
    /// unparseable, or structurally corrupt. The two failure cases also
    /// clear the stored entry so the session starts clean next turn.
    pub async fn load(&self, session_id: &str) -> Vec<ConversationMessage> {
        let key = self.session_key(session_id);

        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, session_id, "session store read failed");
                return Vec::new();
            }
        };

        let messages: Vec<ConversationMessage> = match serde_json::from_str(&raw) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, session_id, "unparseable session history, clearing");
                self.clear(session_id).await;
                return Vec::new();
            }
        };

        // A history opening with an orphaned tool result is an invalid
        // prefix for the model provider; discard rather than crash the turn.
        if messages.first().is_some_and(|m| m.has_tool_result()) {
            warn!(session_id, "session history starts mid tool-exchange, clearing");
            self.clear(session_id).await;
            return Vec::new();
        }

        messages
    }

    /// Appends `new_messages` to the stored history, truncates with the
    /// pair-preserving boundary rule and stores the result under a fresh TTL.
    pub async fn save(
        &self,
        session_id: &str,
        new_messages: Vec<ConversationMessage>,
    ) -> Result<(), MemoryError> {
        let mut history = self.load(session_id).await;
        history.extend(new_messages);

        let bounded = truncate_preserving_pairs(history);

        let serialized = serde_json::to_string(&bounded)?;
        self.store
            .put(&self.session_key(session_id), serialized, SESSION_TTL)
            .await?;
        Ok(())
    }

    /// Deletes the stored entry unconditionally.
    pub async fn clear(&self, session_id: &str) {
        if let Err(e) = self.store.delete(&self.session_key(session_id)).await {
            warn!(error = %e, session_id, "session store delete failed");
        }
    }
}

/// Truncates to `MAX_MESSAGES`, moving the cut backwards when it would
/// orphan a tool result from the tool-call response right before it.
///
/// Pairing correctness outranks the exact count: protecting a pair can keep
/// more than `MAX_MESSAGES`, and if the walk reaches the start of history the
/// whole history is retained for this save.
pub fn truncate_preserving_pairs(
    history: Vec<ConversationMessage>,
) -> Vec<ConversationMessage> {
    if history.len() <= MAX_MESSAGES {
        return history;
    }

    let mut cut = history.len() - MAX_MESSAGES;
    while cut > 0 && history[cut].has_tool_result() {
        cut -= 1;
    }
    if cut == 0 {
        return history;
    }
    history[cut..].to_vec()
}
