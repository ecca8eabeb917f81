//! Non-streaming completions and key validation against a mock server

use ai_lib_vision::{ChatProvider, Error, Message, ProviderKind};
use mockito::Matcher;
use serde_json::json;

use crate::integration::mock_server::{MockServerFixture, TEST_KEY};

const REQUEST_ID: &str = "^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[0-9a-f]{4}-[0-9a-f]{12}$";

#[tokio::test]
async fn test_openai_send() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_header("x-request-id", Matcher::Regex(REQUEST_ID.into()))
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o",
                "max_tokens": 4096,
                "temperature": 0.7,
                "stream": false,
                "messages": [
                    { "role": "system", "content": "You read screens." },
                    { "role": "user", "content": "Hi" },
                ],
            })))
            .with_status(200)
            .with_body(
                r#"{"id":"chatcmpl-1","model":"gpt-4o-2024-08-06","choices":[{"index":0,"message":{"role":"assistant","content":"Hello there"},"finish_reason":"stop"}],"usage":{"prompt_tokens":9,"completion_tokens":3,"total_tokens":12}}"#,
            )
            .create_async()
            .await
    };

    let client = fixture.client(
        fixture
            .config(ProviderKind::OpenAi)
            .with_system_prompt("You read screens."),
    );
    let resp = client.send(&[Message::user("Hi")]).await.unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content, "Hello there");
    assert_eq!(resp.model, "gpt-4o-2024-08-06");
    assert_eq!(resp.total_tokens, Some(12));
    assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn test_grok_send_uses_openai_wire_format() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({ "model": "grok-2-vision-1212" })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Yo"},"finish_reason":"stop"}]}"#)
            .create_async()
            .await
    };

    let resp = fixture
        .client_for(ProviderKind::Grok)
        .send(&[Message::user("Hi")])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content, "Yo");
    assert_eq!(resp.model, "grok-2-vision-1212");
    assert_eq!(resp.total_tokens, None);
}

#[tokio::test]
async fn test_anthropic_send() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/messages")
            .match_header("x-api-key", TEST_KEY)
            .match_header("anthropic-version", "2023-06-01")
            .match_header("x-request-id", Matcher::Regex(REQUEST_ID.into()))
            .match_body(Matcher::PartialJson(json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 4096,
                "system": "You read screens.\n\nAnswer in English.",
                "messages": [{ "role": "user", "content": [{ "type": "text", "text": "Hi" }] }],
            })))
            .with_status(200)
            .with_body(
                r#"{"id":"msg_1","type":"message","role":"assistant","model":"claude-sonnet-4-20250514","content":[{"type":"text","text":"Hello"},{"type":"text","text":" again"}],"stop_reason":"end_turn","usage":{"input_tokens":10,"output_tokens":4}}"#,
            )
            .create_async()
            .await
    };

    let client = fixture.client(
        fixture
            .config(ProviderKind::Anthropic)
            .with_system_prompt("You read screens."),
    );
    let resp = client
        .send(&[Message::system("Answer in English."), Message::user("Hi")])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content, "Hello again");
    assert_eq!(resp.total_tokens, Some(14));
    assert_eq!(resp.finish_reason.as_deref(), Some("end_turn"));
}

#[tokio::test]
async fn test_gemini_send_passes_key_in_query() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock(
                "POST",
                MockServerFixture::completion_path(ProviderKind::Gemini, "gemini-2.0-flash", false),
            )
            .match_query(Matcher::UrlEncoded("key".into(), TEST_KEY.into()))
            .match_body(Matcher::PartialJson(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Hi" }] }],
                "generationConfig": { "maxOutputTokens": 4096 },
                "systemInstruction": { "parts": [{ "text": "You read screens." }] },
            })))
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"Hey"}],"role":"model"},"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":7}}"#,
            )
            .create_async()
            .await
    };

    let client = fixture.client(
        fixture
            .config(ProviderKind::Gemini)
            .with_system_prompt("You read screens."),
    );
    let resp = client.send(&[Message::user("Hi")]).await.unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content, "Hey");
    assert_eq!(resp.model, "gemini-2.0-flash");
    assert_eq!(resp.total_tokens, Some(7));
    assert_eq!(resp.finish_reason.as_deref(), Some("STOP"));
}

#[tokio::test]
async fn test_empty_conversation_sends_placeholder_turn() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/messages")
            .match_body(Matcher::PartialJson(json!({
                "messages": [{ "role": "user", "content": [{ "type": "text", "text": "Hello" }] }],
            })))
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"ok"}]}"#)
            .create_async()
            .await
    };

    let resp = fixture
        .client_for(ProviderKind::Anthropic)
        .send(&[])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content, "ok");
}

#[tokio::test]
async fn test_validate_key_status_mapping() {
    for (status, expected) in [(200, true), (401, false), (403, false), (404, false)] {
        let fixture = MockServerFixture::new().await;
        let _mock = fixture.mock_status("GET", "/models", status, r#"{"data":[]}"#).await;
        let valid = fixture
            .client_for(ProviderKind::OpenAi)
            .validate_key()
            .await
            .unwrap();
        assert_eq!(valid, expected, "status {status}");
    }

    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_status("GET", "/models", 503, "overloaded").await;
    match fixture.client_for(ProviderKind::OpenAi).validate_key().await {
        Err(Error::ServerError { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected ServerError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_validate_key_per_dialect_requests() {
    let fixture = MockServerFixture::new().await;
    let (anthropic, gemini) = {
        let mut server = fixture.server.lock().await;
        let anthropic = server
            .mock("GET", "/models")
            .match_header("x-api-key", TEST_KEY)
            .match_header("anthropic-version", "2023-06-01")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;
        let gemini = server
            .mock("GET", "/models")
            .match_query(Matcher::UrlEncoded("key".into(), TEST_KEY.into()))
            .with_status(403)
            .with_body(r#"{"error":{"code":403}}"#)
            .create_async()
            .await;
        (anthropic, gemini)
    };

    assert!(fixture
        .client_for(ProviderKind::Anthropic)
        .validate_key()
        .await
        .unwrap());
    assert!(!fixture
        .client_for(ProviderKind::Gemini)
        .validate_key()
        .await
        .unwrap());

    anthropic.assert_async().await;
    gemini.assert_async().await;
}

#[tokio::test]
async fn test_set_config_redirects_calls() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_json_response("/messages", r#"{"content":[{"type":"text","text":"from claude"}]}"#)
        .await;

    let mut client = fixture.client_for(ProviderKind::OpenAi);
    client.set_config(fixture.config(ProviderKind::Anthropic));
    let resp = client.send(&[Message::user("Hi")]).await.unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content, "from claude");
    assert_eq!(resp.model, "claude-sonnet-4-20250514");
}
