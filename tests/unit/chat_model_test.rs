use menu_concierge::models::message::ConversationMessage;
use menu_concierge::services::chat_model::{
    ChatModel, ChatModelError, ModelTurn, OpenAiChatModel, ToolSpec,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn model_for(server: &MockServer) -> OpenAiChatModel {
    OpenAiChatModel::new(server.uri(), "sk-test".to_string(), "gpt-4o-mini".to_string())
}

fn tools() -> Vec<ToolSpec> {
    vec![ToolSpec {
        name: "search_menu".to_string(),
        description: "search".to_string(),
        parameters: json!({ "type": "object", "properties": {} }),
    }]
}

#[tokio::test]
async fn tool_call_completion_becomes_a_tool_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call-1",
                        "type": "function",
                        "function": {
                            "name": "search_menu",
                            "arguments": "{\"request\":\"something sweet\"}"
                        }
                    }]
                }
            }]
        })))
        .mount(&server)
        .await;

    let history = vec![ConversationMessage::user_text("something sweet")];
    let turn = model_for(&server)
        .complete("system", &history, &tools())
        .await
        .unwrap();

    match turn {
        ModelTurn::ToolCalls(calls) => {
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].call_id, "call-1");
            assert_eq!(calls[0].arguments["request"], "something sweet");
        }
        other => panic!("expected tool calls, got {other:?}"),
    }
}

#[tokio::test]
async fn structured_completion_becomes_a_final_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"reply\":\"The brownie is great.\",\"recommended_ids\":[\"i-2\"]}"
                }
            }]
        })))
        .mount(&server)
        .await;

    let history = vec![ConversationMessage::user_text("something sweet")];
    let turn = model_for(&server)
        .complete("system", &history, &tools())
        .await
        .unwrap();

    match turn {
        ModelTurn::Final(reply) => {
            assert_eq!(reply.reply, "The brownie is great.");
            assert_eq!(reply.recommended_ids, vec!["i-2".to_string()]);
        }
        other => panic!("expected final, got {other:?}"),
    }
}

#[tokio::test]
async fn api_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let history = vec![ConversationMessage::user_text("hello")];
    let err = model_for(&server)
        .complete("system", &history, &tools())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatModelError::Api { status: 502, .. }));
}

#[tokio::test]
async fn empty_choice_list_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let history = vec![ConversationMessage::user_text("hello")];
    let err = model_for(&server)
        .complete("system", &history, &tools())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatModelError::InvalidResponse(_)));
}
