use menu_concierge::services::reranker::{
    LlmReranker, RerankCandidate, RerankError, Reranker,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reranker_for(server: &MockServer) -> LlmReranker {
    LlmReranker::new(server.uri(), "sk-test".to_string(), "gpt-4o-mini".to_string())
}

fn candidates() -> Vec<RerankCandidate> {
    vec![
        RerankCandidate {
            id: "i-1".to_string(),
            name: "Caesar Salad".to_string(),
            description: "Crisp romaine".to_string(),
            category: "Starters".to_string(),
        },
        RerankCandidate {
            id: "i-2".to_string(),
            name: "Carbonara".to_string(),
            description: "Rich and heavy".to_string(),
            category: "Pasta".to_string(),
        },
    ]
}

fn completion_with(content: &str) -> serde_json::Value {
    json!({
        "choices": [
            { "message": { "role": "assistant", "content": content } }
        ]
    })
}

#[tokio::test]
async fn chosen_ids_come_back_in_answer_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_with(r#"{"ids": ["i-2", "i-1"]}"#)),
        )
        .mount(&server)
        .await;

    let ids = reranker_for(&server)
        .rerank("something light", &candidates())
        .await
        .unwrap();
    assert_eq!(ids, vec!["i-2".to_string(), "i-1".to_string()]);
}

#[tokio::test]
async fn empty_answer_is_ok_and_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_with(r#"{"ids": []}"#)))
        .mount(&server)
        .await;

    let ids = reranker_for(&server)
        .rerank("something light", &candidates())
        .await
        .unwrap();
    assert!(ids.is_empty());
}

#[tokio::test]
async fn empty_candidate_pool_skips_the_call() {
    // No mock mounted: an HTTP call would fail the test.
    let server = MockServer::start().await;

    let ids = reranker_for(&server)
        .rerank("something light", &[])
        .await
        .unwrap();
    assert!(ids.is_empty());
}

#[tokio::test]
async fn http_error_is_surfaced_for_the_caller_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = reranker_for(&server)
        .rerank("something light", &candidates())
        .await
        .unwrap_err();
    assert!(matches!(err, RerankError::Api { status: 500, .. }));
}

#[tokio::test]
async fn non_json_content_is_a_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_with("the salad, probably")),
        )
        .mount(&server)
        .await;

    let err = reranker_for(&server)
        .rerank("something light", &candidates())
        .await
        .unwrap_err();
    assert!(matches!(err, RerankError::InvalidResponse(_)));
}

#[tokio::test]
async fn unknown_object_shape_is_a_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_with(r#"{"verdict": ["i-1"]}"#)),
        )
        .mount(&server)
        .await;

    let err = reranker_for(&server)
        .rerank("something light", &candidates())
        .await
        .unwrap_err();
    assert!(matches!(err, RerankError::InvalidResponse(_)));
}
