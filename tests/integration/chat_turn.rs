use super::{
    create_test_harness, final_turn, start_catalog_server, stored_history,
};
use menu_concierge::models::internal::UpsellKind;
use menu_concierge::orchestrator::TurnError;
use menu_concierge::services::chat_model::{ModelTurn, ToolCallRequest};
use menu_concierge::storage::session_store::SessionStore;
use serde_json::json;

fn search_call(call_id: &str) -> ModelTurn {
    ModelTurn::ToolCalls(vec![ToolCallRequest {
        call_id: call_id.to_string(),
        name: "search_menu".to_string(),
        arguments: json!({ "request": "a burger", "excluded_ids": [] }),
    }])
}

fn surprise_call(call_id: &str) -> ModelTurn {
    ModelTurn::ToolCalls(vec![ToolCallRequest {
        call_id: call_id.to_string(),
        name: "surprise_me".to_string(),
        arguments: json!({ "category_focus": "all" }),
    }])
}

#[tokio::test]
async fn search_turn_recommends_and_upsells_the_hero_item() {
    let server = start_catalog_server().await;
    let harness = create_test_harness(
        &server.uri(),
        vec![
            search_call("call-1"),
            final_turn("Our Smash Burger is a favorite.", &["i-burger"]),
        ],
    );

    let outcome = harness
        .orchestrator
        .run_turn("s-1", "I want a burger")
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Our Smash Burger is a favorite.");
    assert_eq!(outcome.recommended_ids, vec!["i-burger".to_string()]);

    let upsell = outcome.upsell.expect("hero item has a cross-sell rule");
    assert_eq!(upsell.kind, UpsellKind::CrossSell);
    assert!(upsell.message.contains("Fries"));
    assert_eq!(upsell.items, vec!["i-fries".to_string()]);
}

#[tokio::test]
async fn saved_history_keeps_the_tool_pair_adjacent() {
    let server = start_catalog_server().await;
    let harness = create_test_harness(
        &server.uri(),
        vec![
            search_call("call-1"),
            final_turn("Our Smash Burger is a favorite.", &["i-burger"]),
        ],
    );

    harness
        .orchestrator
        .run_turn("s-1", "I want a burger")
        .await
        .unwrap();

    let history = stored_history(&harness.store, "s-1").await;
    // user, tool-call response, tool-result request, reply, upsell note
    assert_eq!(history.len(), 5);
    assert!(history[0].has_user_text());
    assert!(history[1].has_tool_call());
    assert!(history[2].has_tool_result());
    assert!(!history[3].has_tool_call());
    assert!(!history[4].has_tool_call());
}

#[tokio::test]
async fn surprise_turn_returns_three_suggestions_to_the_model() {
    let server = start_catalog_server().await;
    let harness = create_test_harness(
        &server.uri(),
        vec![
            surprise_call("call-1"),
            final_turn("How about these three?", &[]),
        ],
    );

    let outcome = harness
        .orchestrator
        .run_turn("s-2", "surprise me")
        .await
        .unwrap();
    assert!(outcome.upsell.is_none());

    let history = stored_history(&harness.store, "s-2").await;
    let tool_result = &history[2];
    let menu_concierge::models::message::ConversationMessage::Request { parts } = tool_result
    else {
        panic!("expected tool-result request, got {tool_result:?}");
    };
    let menu_concierge::models::message::RequestPart::ToolResult { content, .. } = &parts[0]
    else {
        panic!("expected a tool result part");
    };
    assert_eq!(content["suggestions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn second_turn_sees_the_first_turns_context() {
    let server = start_catalog_server().await;
    let harness = create_test_harness(
        &server.uri(),
        vec![
            final_turn("Welcome! What are you in the mood for?", &[]),
            final_turn("Anything else?", &[]),
        ],
    );

    harness.orchestrator.run_turn("s-3", "hi").await.unwrap();
    harness.orchestrator.run_turn("s-3", "thanks").await.unwrap();

    let history = stored_history(&harness.store, "s-3").await;
    assert_eq!(history.len(), 4);
    assert!(history[0].has_user_text());
    assert!(history[2].has_user_text());
}

#[tokio::test]
async fn empty_message_fails_without_touching_the_store() {
    let server = start_catalog_server().await;
    let harness = create_test_harness(&server.uri(), vec![]);

    let err = harness
        .orchestrator
        .run_turn("s-4", "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, TurnError::EmptyMessage));
    assert!(harness
        .store
        .get("concierge:chat:s-4")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn model_failure_commits_nothing_to_history() {
    let server = start_catalog_server().await;
    // Empty script: the first completion call errors.
    let harness = create_test_harness(&server.uri(), vec![]);

    let err = harness
        .orchestrator
        .run_turn("s-5", "I want a burger")
        .await
        .unwrap_err();
    assert!(matches!(err, TurnError::Model(_)));
    assert!(harness
        .store
        .get("concierge:chat:s-5")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn endless_tool_requests_abort_the_turn() {
    let server = start_catalog_server().await;
    let harness = create_test_harness(
        &server.uri(),
        vec![
            search_call("c1"),
            search_call("c2"),
            search_call("c3"),
            search_call("c4"),
            search_call("c5"),
        ],
    );

    let err = harness
        .orchestrator
        .run_turn("s-6", "I want a burger")
        .await
        .unwrap_err();
    assert!(matches!(err, TurnError::NoFinalReply));
}

#[tokio::test]
async fn catalog_outage_still_produces_a_turn() {
    // No catalog server at all: the lazy refresh fails, the search tool
    // degrades to an empty pool, and the turn completes.
    let harness = create_test_harness(
        "http://127.0.0.1:1",
        vec![
            search_call("call-1"),
            final_turn("Nothing fits right now, sorry!", &[]),
        ],
    );

    let outcome = harness
        .orchestrator
        .run_turn("s-7", "I want a burger")
        .await
        .unwrap();
    assert!(outcome.recommended_ids.is_empty());
    assert!(outcome.upsell.is_none());
}
