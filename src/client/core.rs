use crate::client::ChatProvider;
use crate::drivers::{create_driver, ProviderDriver};
use crate::transport::HttpTransport;
use crate::types::{Dialect, Message, ProviderConfig, UniformResponse};
use crate::Result;
use async_trait::async_trait;

/// Client bound to one provider configuration.
///
/// `send*` take `&self`; replacing the configuration needs `&mut self`, so it
/// can never race an in-flight call.
#[derive(Debug)]
pub struct LlmClient {
    pub(crate) config: ProviderConfig,
    pub(crate) driver: Box<dyn ProviderDriver>,
    pub(crate) transport: HttpTransport,
}

impl LlmClient {
    /// Client with a transport configured from the environment.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        Ok(Self::with_transport(config, HttpTransport::from_env()?))
    }

    pub fn with_transport(config: ProviderConfig, transport: HttpTransport) -> Self {
        let driver = create_driver(config.kind, config.base_url());
        Self {
            config,
            driver,
            transport,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Replace the configuration wholesale. The driver is re-selected, so the
    /// provider kind may change too.
    pub fn set_config(&mut self, config: ProviderConfig) {
        self.driver = create_driver(config.kind, config.base_url());
        self.config = config;
    }

    pub fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }
}

#[async_trait]
impl ChatProvider for LlmClient {
    async fn validate_key(&self) -> Result<bool> {
        self.validate_once().await
    }

    async fn send(&self, messages: &[Message]) -> Result<UniformResponse> {
        self.execute_once(messages).await
    }

    async fn send_streaming(
        &self,
        messages: &[Message],
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<UniformResponse> {
        self.execute_stream_once(messages, on_token).await
    }
}
