//! Anthropic Messages API 驱动：请求构建与流式事件解析。
//!
//! Anthropic Messages API driver.
//!
//! Differences from the OpenAI-compatible schema:
//! - Credential in `x-api-key`, plus a fixed `anthropic-version` header.
//! - System text is the top-level `system` field; system-role turns never appear in `messages`.
//! - Content is an array of typed blocks; an image block precedes the text block.
//! - Temperature range is `[0, 1]`.
//! - Streams carry `event:` lines; `event: message_stop` terminates.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    api_key, clamp_temperature, credential_header, endpoint, merged_system_text, sse_data,
    DriverRequest, FrameFlow, ProviderDriver, StreamAccumulator, PLACEHOLDER_TURN_TEXT,
};
use crate::types::{Dialect, Message, MessageRole, ProviderConfig, UniformResponse};
use crate::utils::EncodedImage;
use crate::{Error, Result};

pub const API_VERSION: &str = "2023-06-01";
pub const MAX_TEMPERATURE: f64 = 1.0;
/// Stop reason reported when a stream ends without one.
pub const DEFAULT_STOP_REASON: &str = "end_turn";
const STREAM_END_EVENT: &str = "message_stop";

/// Anthropic Messages API driver.
#[derive(Debug, Clone)]
pub struct AnthropicDriver {
    base_url: String,
}

impl AnthropicDriver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn headers(config: &ProviderConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", credential_header(api_key(config)?)?);
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    fn content_blocks(message: &Message) -> Result<Vec<Value>> {
        let mut blocks = Vec::with_capacity(2);
        if let Some(bytes) = &message.image {
            let image = EncodedImage::encode(bytes)?;
            blocks.push(json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.media_type,
                    "data": image.data,
                }
            }));
        }
        // The API rejects empty text blocks; an image alone is a valid turn.
        if !message.content.is_empty() || blocks.is_empty() {
            blocks.push(json!({ "type": "text", "text": message.content }));
        }
        Ok(blocks)
    }

    /// Non-system turns in order, with the placeholder substituted when none remain.
    fn build_messages(messages: &[Message]) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(messages.len());
        for message in messages {
            let role = match message.role {
                MessageRole::System => continue,
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            };
            out.push(json!({ "role": role, "content": Self::content_blocks(message)? }));
        }
        if out.is_empty() {
            out.push(json!({
                "role": "user",
                "content": [{ "type": "text", "text": PLACEHOLDER_TURN_TEXT }],
            }));
        }
        Ok(out)
    }
}

impl ProviderDriver for AnthropicDriver {
    fn dialect(&self) -> Dialect {
        Dialect::AnthropicMessages
    }

    fn validation_request(&self, config: &ProviderConfig) -> Result<DriverRequest> {
        Ok(DriverRequest {
            method: Method::GET,
            url: endpoint(&self.base_url, "models")?,
            headers: Self::headers(config)?,
            body: None,
            stream: false,
        })
    }

    fn build_request(
        &self,
        config: &ProviderConfig,
        messages: &[Message],
        stream: bool,
    ) -> Result<DriverRequest> {
        let mut body = json!({
            "model": config.model,
            "messages": Self::build_messages(messages)?,
            "max_tokens": config.max_tokens,
            "temperature": clamp_temperature(config.temperature, MAX_TEMPERATURE),
            "stream": stream,
        });
        let system = merged_system_text(config, messages);
        if !system.is_empty() {
            body["system"] = Value::String(system);
        }

        Ok(DriverRequest {
            method: Method::POST,
            url: endpoint(&self.base_url, "messages")?,
            headers: Self::headers(config)?,
            body: Some(body),
            stream,
        })
    }

    fn parse_response(&self, config: &ProviderConfig, raw: &str) -> Result<UniformResponse> {
        let parsed: MessagesResponse = serde_json::from_str(raw)
            .map_err(|e| Error::invalid_response(format!("malformed messages response: {}", e), raw))?;

        let content = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<String>();

        Ok(UniformResponse {
            content,
            model: parsed
                .model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| config.model.clone()),
            total_tokens: parsed.usage.and_then(|u| u.total()),
            finish_reason: parsed.stop_reason,
        })
    }

    fn apply_stream_line(
        &self,
        acc: &mut StreamAccumulator,
        line: &str,
        on_token: &mut dyn FnMut(&str),
    ) -> FrameFlow {
        if let Some(event) = line.strip_prefix("event:") {
            return if event.trim() == STREAM_END_EVENT {
                FrameFlow::Done
            } else {
                FrameFlow::Continue
            };
        }
        let Some(data) = sse_data(line) else {
            return FrameFlow::Continue;
        };
        if data.trim().is_empty() {
            return FrameFlow::Continue;
        }

        let frame: StreamFrame = match serde_json::from_str(data) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "skipping malformed anthropic stream frame");
                return FrameFlow::Continue;
            }
        };

        match frame.kind.as_str() {
            "message_start" => {
                if let Some(message) = frame.message {
                    acc.set_model(message.model);
                    if let Some(usage) = message.usage {
                        acc.prompt_tokens = usage.input_tokens.or(acc.prompt_tokens);
                        acc.total_tokens = usage.total().or(acc.total_tokens);
                    }
                }
            }
            "content_block_delta" => {
                if let Some(text) = frame.delta.and_then(|d| d.text) {
                    acc.push_text(&text, on_token);
                }
            }
            "message_delta" => {
                if let Some(reason) = frame.delta.and_then(|d| d.stop_reason) {
                    acc.finish_reason = Some(reason);
                }
                if let Some(output) = frame.usage.and_then(|u| u.output_tokens) {
                    acc.total_tokens = Some(acc.prompt_tokens.unwrap_or(0) + output);
                }
            }
            STREAM_END_EVENT => return FrameFlow::Done,
            _ => {}
        }
        FrameFlow::Continue
    }

    fn finish_stream(&self, mut acc: StreamAccumulator, config: &ProviderConfig) -> UniformResponse {
        if acc.finish_reason.is_none() {
            acc.finish_reason = Some(DEFAULT_STOP_REASON.to_string());
        }
        acc.into_response(&config.model)
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
}

impl Usage {
    fn total(&self) -> Option<u64> {
        match (self.input_tokens, self.output_tokens) {
            (None, None) => None,
            (i, o) => Some(i.unwrap_or(0) + o.unwrap_or(0)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<StartMessage>,
    #[serde(default)]
    delta: Option<FrameDelta>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct StartMessage {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct FrameDelta {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
}
