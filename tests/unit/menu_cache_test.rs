use std::sync::Arc;

use menu_concierge::services::catalog_client::CatalogClient;
use menu_concierge::services::embedding_provider::{EmbeddingProvider, ProviderError};
use menu_concierge::storage::menu_cache::MenuCache;
use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Batch embedder scripted per input index; flips to failure on demand.
struct ScriptedEmbedder {
    batch: std::sync::Mutex<Result<Vec<Vec<f32>>, ProviderError>>,
}

impl ScriptedEmbedder {
    fn ok(batch: Vec<Vec<f32>>) -> Self {
        Self {
            batch: std::sync::Mutex::new(Ok(batch)),
        }
    }

    fn failing() -> Self {
        Self {
            batch: std::sync::Mutex::new(Err(ProviderError::NoEmbeddings)),
        }
    }

    fn set(&self, next: Result<Vec<Vec<f32>>, ProviderError>) {
        *self.batch.lock().unwrap() = next;
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        match &*self.batch.lock().unwrap() {
            Ok(batch) => Ok(batch[..texts.len()].to_vec()),
            Err(e) => Err(e.clone()),
        }
    }
}

async fn mount_catalog(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok-123" })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/menu-items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

fn two_item_catalog() -> serde_json::Value {
    json!([
        {
            "id": "i-1",
            "name": "Lemonade",
            "price": "6.00",
            "description": "Fresh squeezed",
            "category": { "name": "Drinks" },
            "upsellItems": []
        },
        {
            "id": "i-2",
            "name": "Brownie",
            "price": "8.00",
            "description": "Warm, with ice cream",
            "category": { "name": "Desserts" },
            "upsellItems": []
        }
    ])
}

#[tokio::test]
async fn refresh_builds_the_snapshot_and_associates_vectors_in_order() {
    let server = MockServer::start().await;
    mount_catalog(&server, two_item_catalog()).await;

    let catalog = Arc::new(CatalogClient::new(server.uri(), String::new(), String::new()));
    let embedder = Arc::new(ScriptedEmbedder::ok(vec![vec![1.0, 0.0], vec![0.0, 1.0]]));
    let cache = MenuCache::new(catalog, embedder);

    assert!(cache.is_empty().await);
    let count = cache.refresh().await.unwrap();
    assert_eq!(count, 2);
    assert!(!cache.is_empty().await);

    let snapshot = cache.snapshot().await;
    assert_eq!(snapshot.get("i-1").unwrap().embedding, vec![1.0, 0.0]);
    assert_eq!(snapshot.get("i-2").unwrap().embedding, vec![0.0, 1.0]);
}

#[tokio::test]
async fn catalog_failure_leaves_the_old_snapshot_published() {
    let server = MockServer::start().await;
    mount_catalog(&server, two_item_catalog()).await;

    let catalog = Arc::new(CatalogClient::new(server.uri(), String::new(), String::new()));
    let embedder = Arc::new(ScriptedEmbedder::ok(vec![vec![1.0, 0.0], vec![0.0, 1.0]]));
    let cache = MenuCache::new(catalog, embedder);
    cache.refresh().await.unwrap();

    // Upstream goes away; the refresh fails but readers keep the old view.
    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(cache.refresh().await.is_err());
    let snapshot = cache.snapshot().await;
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.get("i-1").is_some());
}

#[tokio::test]
async fn embedding_failure_leaves_the_old_snapshot_published() {
    let server = MockServer::start().await;
    mount_catalog(&server, two_item_catalog()).await;

    let catalog = Arc::new(CatalogClient::new(server.uri(), String::new(), String::new()));
    let embedder = Arc::new(ScriptedEmbedder::ok(vec![vec![1.0, 0.0], vec![0.0, 1.0]]));
    let cache = MenuCache::new(catalog, embedder.clone());
    cache.refresh().await.unwrap();

    embedder.set(Err(ProviderError::NoEmbeddings));
    assert!(cache.refresh().await.is_err());

    let snapshot = cache.snapshot().await;
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test]
async fn failed_first_refresh_keeps_the_cache_empty() {
    let server = MockServer::start().await;
    mount_catalog(&server, two_item_catalog()).await;

    let catalog = Arc::new(CatalogClient::new(server.uri(), String::new(), String::new()));
    let embedder = Arc::new(ScriptedEmbedder::failing());
    let cache = MenuCache::new(catalog, embedder);

    assert!(cache.refresh().await.is_err());
    assert!(cache.is_empty().await);
}
