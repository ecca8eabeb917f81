//! Integration tests for error handling

use ai_lib_vision::{ChatProvider, Error, Message, ProviderConfig, ProviderKind};

use crate::integration::mock_server::MockServerFixture;

fn model(kind: ProviderKind) -> &'static str {
    kind.default_model()
}

#[tokio::test]
async fn test_rate_limited_on_both_send_paths() {
    for kind in ProviderKind::ALL {
        let fixture = MockServerFixture::new().await;
        let client = fixture.client_for(kind);
        let body = r#"{"error":{"message":"slow down"}}"#;

        let _blocking = fixture
            .mock_status("POST", MockServerFixture::completion_path(kind, model(kind), false), 429, body)
            .await;
        let err = client.send(&[Message::user("Hi")]).await.unwrap_err();
        assert!(matches!(err, Error::RateLimited), "{kind}: {err:?}");
        assert!(err.is_rate_limited());

        let _streaming = fixture
            .mock_status("POST", MockServerFixture::completion_path(kind, model(kind), true), 429, body)
            .await;
        let mut called = false;
        let err = client
            .send_streaming(&[Message::user("Hi")], &mut |_: &str| called = true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited), "{kind} stream: {err:?}");
        assert!(!called);
    }
}

#[tokio::test]
async fn test_server_error_carries_status_and_body() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_status("POST", "/chat/completions", 500, r#"{"error":"internal"}"#)
        .await;

    let err = fixture
        .client_for(ProviderKind::OpenAi)
        .send(&[Message::user("Hi")])
        .await
        .unwrap_err();
    match &err {
        Error::ServerError { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, r#"{"error":"internal"}"#);
        }
        other => panic!("expected ServerError, got {other:?}"),
    }
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_unfollowed_redirect_status_is_invalid_response() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_status("POST", "/chat/completions", 300, r#"{"choices":[]}"#)
        .await;

    let err = fixture
        .client_for(ProviderKind::OpenAi)
        .send(&[Message::user("Hi")])
        .await
        .unwrap_err();
    match &err {
        Error::InvalidResponse(detail) => assert!(detail.contains("unexpected HTTP status 300"), "{detail}"),
        other => panic!("expected InvalidResponse, got {other:?}"),
    }
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_unauthorized_send_is_server_error() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_status("POST", "/messages", 401, r#"{"type":"error","error":{"type":"authentication_error"}}"#)
        .await;

    let err = fixture
        .client_for(ProviderKind::Anthropic)
        .send_streaming(&[Message::user("Hi")], &mut |_: &str| {})
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ServerError { status: 401, .. }), "{err:?}");
}

#[tokio::test]
async fn test_long_error_body_is_truncated_on_display() {
    let fixture = MockServerFixture::new().await;
    let body = "x".repeat(4000);
    let _mock = fixture.mock_status("POST", "/chat/completions", 502, &body).await;

    let err = fixture
        .client_for(ProviderKind::OpenAi)
        .send(&[Message::user("Hi")])
        .await
        .unwrap_err();
    let shown = err.to_string();
    assert!(shown.contains("502"));
    assert!(shown.len() < 1000);
}

#[tokio::test]
async fn test_undecodable_success_body_is_invalid_response() {
    for kind in ProviderKind::ALL {
        let fixture = MockServerFixture::new().await;
        let _mock = fixture
            .mock_json_response(
                MockServerFixture::completion_path(kind, model(kind), false),
                "<html>gateway</html>",
            )
            .await;

        let err = fixture
            .client_for(kind)
            .send(&[Message::user("Hi")])
            .await
            .unwrap_err();
        match err {
            Error::InvalidResponse(detail) => assert!(detail.contains("gateway"), "{kind}: {detail}"),
            other => panic!("{kind}: expected InvalidResponse, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_blank_key_fails_before_request() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await
    };

    let config = ProviderConfig::new(ProviderKind::OpenAi, "  ").with_base_url(&fixture.base_url);
    let client = fixture.client(config);
    let err = client.send(&[Message::user("Hi")]).await.unwrap_err();
    assert!(matches!(err, Error::InvalidApiKey(_)), "{err:?}");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unrecognised_image_fails_encoding() {
    let fixture = MockServerFixture::new().await;
    let client = fixture.client_for(ProviderKind::Gemini);
    let msg = Message::user("What is this?").with_image(b"not an image".to_vec());

    let err = client.send(&[msg]).await.unwrap_err();
    assert!(matches!(err, Error::ImageEncodingFailed(_)), "{err:?}");
}

#[tokio::test]
async fn test_invalid_base_url() {
    let fixture = MockServerFixture::new().await;
    let client = fixture.client(fixture.config(ProviderKind::Anthropic).with_base_url("localhost:9/v1"));

    let err = client.validate_key().await.unwrap_err();
    assert!(matches!(err, Error::InvalidEndpoint(_)), "{err:?}");
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let fixture = MockServerFixture::new().await;
    let client = fixture.client(fixture.config(ProviderKind::OpenAi).with_base_url("http://127.0.0.1:9"));

    let err = client.send(&[Message::user("Hi")]).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)), "{err:?}");
}
