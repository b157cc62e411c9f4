use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Import our modules
use menu_concierge::{
    api::routes::{self, AppState},
    config::Config,
    orchestrator::ChatOrchestrator,
    services::{
        catalog_client::CatalogClient, chat_model::OpenAiChatModel,
        embedding_provider::OpenAiEmbeddingProvider, reranker::LlmReranker,
    },
    storage::{menu_cache::MenuCache, session_store::InMemorySessionStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "menu_concierge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let config = Config::load()?;

    // Upstream collaborators
    let catalog = Arc::new(CatalogClient::new(
        config.catalog_base_url.clone(),
        config.catalog_email.clone(),
        config.catalog_password.clone(),
    ));
    let embedder = Arc::new(OpenAiEmbeddingProvider::new(
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
        config.embedding_model.clone(),
    ));
    let reranker = Arc::new(LlmReranker::new(
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
        config.rerank_model.clone(),
    ));
    let chat_model = Arc::new(OpenAiChatModel::new(
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
        config.chat_model.clone(),
    ));

    // Process-wide state
    let cache = Arc::new(MenuCache::new(catalog.clone(), embedder.clone()));
    let store = Arc::new(InMemorySessionStore::new());

    let orchestrator = Arc::new(ChatOrchestrator::new(
        cache.clone(),
        embedder,
        reranker,
        chat_model,
        store,
        config.session_namespace.clone(),
    ));

    // Prewarm: category context plus the embedding cache. Failures are
    // logged; the first chat turn falls back to a lazy refresh.
    match catalog.fetch_category_tree().await {
        Ok(rendered) => {
            orchestrator.set_categories(rendered).await;
            tracing::info!("category context loaded");
        }
        Err(e) => tracing::warn!(error = %e, "category prewarm failed"),
    }
    match cache.refresh().await {
        Ok(count) => tracing::info!(count, "menu cache prewarmed"),
        Err(e) => tracing::warn!(error = %e, "menu cache prewarm failed"),
    }

    // Create application state
    let state = AppState {
        orchestrator,
        cache,
    };

    let app = routes::create_router(state);

    // Start server
    let addr_str = format!("0.0.0.0:{}", config.server_port);
    let addr: SocketAddr = addr_str.parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 Server listening on {}", addr);
    tracing::info!("🍽️  Catalog URL: {}", config.catalog_base_url);
    tracing::info!("🤖 LLM URL: {}", config.llm_base_url);
    tracing::info!("💬 Chat: POST /api/v1/chat");

    axum::serve(listener, app).await?;

    Ok(())
}
