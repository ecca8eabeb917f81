//! Provider client: one driver plus one transport behind a small async surface.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod core;
mod execution;

pub use self::core::LlmClient;

use crate::types::{Message, ProviderConfig, UniformResponse};
use crate::Result;
use async_trait::async_trait;

/// Common contract of every backend.
///
/// Calls are cancelled by dropping the returned future; the underlying
/// connection is closed with it.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Check the configured credential with a cheap authenticated request.
    ///
    /// `Ok(true)` only for a 2xx status. A 5xx is reported as
    /// [`Error::ServerError`](crate::Error::ServerError); every other status is `Ok(false)`.
    async fn validate_key(&self) -> Result<bool>;

    /// Send the conversation and wait for the complete answer.
    async fn send(&self, messages: &[Message]) -> Result<UniformResponse>;

    /// Send the conversation as a streaming request.
    ///
    /// Each text delta is passed to `on_token` in arrival order before the
    /// accumulated response is returned.
    async fn send_streaming(
        &self,
        messages: &[Message],
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<UniformResponse>;
}

/// Build a client for `config.kind`. Performs no network activity.
pub fn create_client(config: ProviderConfig) -> Result<LlmClient> {
    LlmClient::new(config)
}
