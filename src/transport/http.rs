use crate::drivers::DriverRequest;
use crate::transport::TransportError;
use crate::{Error, Result};
use reqwest::Proxy;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Time allowed until the response head arrives.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Time allowed for the whole exchange, body included.
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared reqwest connection with timeouts sized for slow generations.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Build with defaults, overridable through the environment:
    /// `AI_VISION_REQUEST_TIMEOUT_SECS`, `AI_VISION_TOTAL_TIMEOUT_SECS`, `AI_VISION_PROXY_URL`.
    pub fn from_env() -> Result<Self> {
        let request_timeout = env_secs("AI_VISION_REQUEST_TIMEOUT_SECS")
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let total_timeout =
            env_secs("AI_VISION_TOTAL_TIMEOUT_SECS").unwrap_or(DEFAULT_TOTAL_TIMEOUT);

        let mut builder = Self::client_builder(total_timeout);
        if let Ok(proxy_url) = env::var("AI_VISION_PROXY_URL") {
            match Proxy::all(&proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => warn!(error = %e, "ignoring invalid AI_VISION_PROXY_URL"),
            }
        }

        Self::from_builder(builder, request_timeout)
    }

    pub fn with_timeouts(request_timeout: Duration, total_timeout: Duration) -> Result<Self> {
        Self::from_builder(Self::client_builder(total_timeout), request_timeout)
    }

    fn client_builder(total_timeout: Duration) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .timeout(total_timeout)
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .http2_keep_alive_interval(Some(Duration::from_secs(30)))
            .http2_keep_alive_timeout(Duration::from_secs(10))
    }

    fn from_builder(builder: reqwest::ClientBuilder, request_timeout: Duration) -> Result<Self> {
        let client = builder
            .build()
            .map_err(|e| Error::Network(TransportError::Other(e.to_string())))?;
        Ok(Self {
            client,
            request_timeout,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Send the request and wait for the response head. The status is not inspected.
    ///
    /// Dropping the returned future (or the response) aborts the connection.
    pub async fn execute(&self, request: &DriverRequest) -> Result<reqwest::Response> {
        let request_id = Uuid::new_v4().to_string();
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .header("x-request-id", &request_id);
        if request.stream {
            builder = builder.header("accept", "text/event-stream");
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        // Never log the full URL: Gemini carries the key in the query string.
        debug!(
            request_id = %request_id,
            method = %request.method,
            host = request.url.host_str().unwrap_or(""),
            path = request.url.path(),
            stream = request.stream,
            "sending provider request"
        );

        match tokio::time::timeout(self.request_timeout, builder.send()).await {
            Ok(Ok(response)) => {
                debug!(request_id = %request_id, status = response.status().as_u16(), "response head received");
                Ok(response)
            }
            Ok(Err(e)) => Err(Error::Network(TransportError::Http(e.without_url()))),
            Err(_) => Err(Error::Network(TransportError::Timeout(self.request_timeout))),
        }
    }

    /// Like [`execute`](Self::execute) but maps non-success statuses to errors
    /// (see [`check_status`]).
    pub async fn execute_checked(&self, request: &DriverRequest) -> Result<reqwest::Response> {
        let response = self.execute(request).await?;
        check_status(response).await
    }
}

/// Pass 2xx responses through and drain everything else into an error.
///
/// 4xx/5xx: 429 becomes `RateLimited`, the rest `ServerError` with the body.
/// Redirects are followed by the client, so a 1xx/3xx reaching this point is
/// not an answer the provider can give and becomes `InvalidResponse`.
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    if !(status.is_client_error() || status.is_server_error()) {
        warn!(status = code, "provider returned non-final status");
        return Err(Error::invalid_response(format!("unexpected HTTP status {}", code), &body));
    }
    warn!(status = code, "provider returned error status");
    Err(Error::from_status(code, body))
}

fn env_secs(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
