use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::{
    api::dto::*,
    orchestrator::{ChatOrchestrator, TurnError},
    storage::menu_cache::MenuCache,
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub cache: Arc<MenuCache>,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let session_id = req
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let outcome = state
        .orchestrator
        .run_turn(&session_id, &req.message)
        .await
        .map_err(|e| match e {
            TurnError::EmptyMessage => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Empty message".to_string(),
                    code: 400,
                }),
            ),
            other => {
                tracing::error!(error = %other, "chat turn failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Internal error while processing the chat turn".to_string(),
                        code: 500,
                    }),
                )
            }
        })?;

    Ok(Json(ChatResponse {
        session_id: outcome.session_id,
        reply: outcome.reply,
        recommended_ids: outcome.recommended_ids,
        upsell: outcome.upsell.map(UpsellDto::from),
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online".to_string(),
        menu_loaded: !state.cache.is_empty().await,
    })
}

pub async fn metrics(State(state): State<AppState>) -> String {
    let count = state.cache.snapshot().await.len();

    format!(
        "# HELP concierge_menu_items_cached Items in the embedding cache\n\
         # TYPE concierge_menu_items_cached gauge\n\
         concierge_menu_items_cached {}\n\
         # HELP concierge_up Whether the service is up\n\
         # TYPE concierge_up gauge\n\
         concierge_up 1\n",
        count
    )
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/chat", post(chat))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        // The web front end calls from another origin.
        .layer(CorsLayer::permissive())
        .with_state(state)
}
