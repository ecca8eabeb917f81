//! Mock HTTP server setup for integration tests

use ai_lib_vision::transport::HttpTransport;
use ai_lib_vision::{LlmClient, ProviderConfig, ProviderKind};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const TEST_KEY: &str = "test-key";

/// Smallest byte string recognised as a PNG; encodes to `iVBORw0KGgoAAAAN`.
pub const TINY_PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
];
pub const TINY_PNG_BASE64: &str = "iVBORw0KGgoAAAAN";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Config for `kind` pointed at the mock server.
    pub fn config(&self, kind: ProviderKind) -> ProviderConfig {
        ProviderConfig::new(kind, TEST_KEY).with_base_url(&self.base_url)
    }

    /// Client with short timeouts so a missing mock fails fast.
    pub fn client(&self, config: ProviderConfig) -> LlmClient {
        let transport = HttpTransport::with_timeouts(Duration::from_secs(5), Duration::from_secs(10))
            .expect("transport");
        LlmClient::with_transport(config, transport)
    }

    pub fn client_for(&self, kind: ProviderKind) -> LlmClient {
        self.client(self.config(kind))
    }

    /// Mock an SSE body; each entry is written as one line.
    pub async fn mock_sse_lines(&self, path: impl Into<Matcher>, lines: &[&str]) -> Mock {
        let mut body = lines.join("\n");
        body.push('\n');
        let mut server = self.server.lock().await;
        server
            .mock("POST", path)
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock for a successful JSON response
    pub async fn mock_json_response(&self, path: impl Into<Matcher>, body: &str) -> Mock {
        self.mock_status("POST", path, 200, body).await
    }

    pub async fn mock_status(
        &self,
        method: &str,
        path: impl Into<Matcher>,
        status: usize,
        body: &str,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock(method, path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Completion path of `kind` relative to the base URL.
    pub fn completion_path(kind: ProviderKind, model: &str, stream: bool) -> Matcher {
        match kind {
            ProviderKind::OpenAi | ProviderKind::Grok => "/chat/completions".into(),
            ProviderKind::Anthropic => "/messages".into(),
            ProviderKind::Gemini => {
                let method = if stream {
                    "streamGenerateContent"
                } else {
                    "generateContent"
                };
                Matcher::Regex(format!(r"^/models/{}:{}", regex_escape(model), method))
            }
        }
    }
}

fn regex_escape(raw: &str) -> String {
    raw.replace('.', r"\.")
}
