//! 请求执行逻辑：单次尝试的密钥校验、普通请求与流式请求。
//!
//! Request execution logic (single attempt, no retry).

use crate::transport::{self, TransportError};
use crate::types::{Message, UniformResponse};
use crate::{Error, Result};
use futures::StreamExt;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::core::LlmClient;
use crate::drivers::{FrameFlow, StreamAccumulator};

impl LlmClient {
    pub(crate) async fn validate_once(&self) -> Result<bool> {
        let request = self.driver.validation_request(&self.config)?;
        let response = self.transport.execute(&request).await?;
        let status = response.status();

        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!(provider = %self.config.kind, status = status.as_u16(), "key validation hit a server error");
            return Err(Error::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let valid = status.is_success();
        info!(provider = %self.config.kind, status = status.as_u16(), valid, "validated API key");
        Ok(valid)
    }

    pub(crate) async fn execute_once(&self, messages: &[Message]) -> Result<UniformResponse> {
        let request = self.driver.build_request(&self.config, messages, false)?;
        let start = Instant::now();
        let response = self.transport.execute_checked(&request).await?;
        let raw = response
            .text()
            .await
            .map_err(|e| Error::Network(TransportError::Http(e.without_url())))?;

        let parsed = self.driver.parse_response(&self.config, &raw)?;
        info!(
            provider = %self.config.kind,
            model = %parsed.model,
            total_tokens = ?parsed.total_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "completion finished"
        );
        Ok(parsed)
    }

    /// Stream one request, folding lines until a terminal marker or end of body.
    ///
    /// The status is checked once, before the first line is read.
    pub(crate) async fn execute_stream_once(
        &self,
        messages: &[Message],
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<UniformResponse> {
        let request = self.driver.build_request(&self.config, messages, true)?;
        let start = Instant::now();
        let response = self.transport.execute_checked(&request).await?;

        let mut lines = transport::lines(response);
        let mut acc = StreamAccumulator::new();
        let mut terminated = false;
        let mut line_count: u64 = 0;

        while let Some(line) = lines.next().await {
            let line = line?;
            line_count += 1;
            if self.driver.apply_stream_line(&mut acc, &line, &mut *on_token) == FrameFlow::Done {
                terminated = true;
                break;
            }
        }

        if !terminated && self.driver.has_terminal_marker() {
            warn!(
                provider = %self.config.kind,
                lines = line_count,
                "stream ended without a terminal marker; returning partial content"
            );
        }
        debug!(lines = line_count, terminated, "stream closed");

        let parsed = self.driver.finish_stream(acc, &self.config);
        info!(
            provider = %self.config.kind,
            model = %parsed.model,
            total_tokens = ?parsed.total_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "streaming completion finished"
        );
        Ok(parsed)
    }
}
