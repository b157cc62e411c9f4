//! Menu Concierge - conversational menu ordering assistant

pub mod api;
pub mod config;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;

// Re-export main types for convenience
pub use crate::api::dto::*;
pub use crate::api::routes::{create_router, AppState};
pub use crate::config::Config;
pub use crate::models::internal::{MenuItem, UpsellData, UpsellKind, UpsellRule};
pub use crate::models::message::{ConversationMessage, RequestPart, ResponsePart};
pub use crate::orchestrator::{ChatOrchestrator, TurnError, TurnOutcome};
pub use crate::services::catalog_client::CatalogClient;
pub use crate::services::embedding_provider::{EmbeddingProvider, OpenAiEmbeddingProvider};
pub use crate::storage::menu_cache::{MenuCache, MenuSnapshot};
pub use crate::storage::session_store::{InMemorySessionStore, SessionStore};
