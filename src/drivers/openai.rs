//! OpenAI-compatible chat completions driver (OpenAI, Grok/xAI).
//!
//! - Bearer-token `Authorization` header.
//! - System prompt is the leading `system` entry of `messages`.
//! - Images travel as `data:` URLs inside `image_url` parts.
//! - Streaming frames are `data: <chunk>` lines ending with `data: [DONE]`.

use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    api_key, clamp_temperature, credential_header, endpoint, sse_data, DriverRequest, FrameFlow,
    ProviderDriver, StreamAccumulator, PLACEHOLDER_TURN_TEXT,
};
use crate::types::{Dialect, Message, ProviderConfig, UniformResponse};
use crate::utils::EncodedImage;
use crate::{Error, Result};

pub const MAX_TEMPERATURE: f64 = 2.0;
const DONE_SIGNAL: &str = "[DONE]";

/// Driver for every provider speaking the `/chat/completions` schema.
#[derive(Debug, Clone)]
pub struct OpenAiDriver {
    base_url: String,
}

impl OpenAiDriver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_headers(config: &ProviderConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            credential_header(&format!("Bearer {}", api_key(config)?))?,
        );
        Ok(headers)
    }

    fn message_to_value(message: &Message) -> Result<Value> {
        let content = match &message.image {
            None => Value::String(message.content.clone()),
            Some(bytes) => {
                let image = EncodedImage::encode(bytes)?;
                let image_part = json!({ "type": "image_url", "image_url": { "url": image.data_url() } });
                if message.content.is_empty() {
                    json!([image_part])
                } else {
                    json!([{ "type": "text", "text": message.content }, image_part])
                }
            }
        };
        Ok(json!({ "role": message.role.as_str(), "content": content }))
    }

    fn build_messages(config: &ProviderConfig, messages: &[Message]) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(messages.len() + 2);
        if !config.system_prompt.trim().is_empty() {
            out.push(json!({ "role": "system", "content": config.system_prompt }));
        }
        for message in messages {
            out.push(Self::message_to_value(message)?);
        }
        if !messages.iter().any(|m| !m.is_system()) {
            out.push(json!({ "role": "user", "content": PLACEHOLDER_TURN_TEXT }));
        }
        Ok(out)
    }
}

impl ProviderDriver for OpenAiDriver {
    fn dialect(&self) -> Dialect {
        Dialect::OpenAiCompatible
    }

    fn validation_request(&self, config: &ProviderConfig) -> Result<DriverRequest> {
        Ok(DriverRequest {
            method: Method::GET,
            url: endpoint(&self.base_url, "models")?,
            headers: Self::auth_headers(config)?,
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
            "messages": Self::build_messages(config, messages)?,
            "max_tokens": config.max_tokens,
            "temperature": clamp_temperature(config.temperature, MAX_TEMPERATURE),
            "stream": stream,
        });
        if stream {
            body["stream_options"] = json!({ "include_usage": true });
        }

        Ok(DriverRequest {
            method: Method::POST,
            url: endpoint(&self.base_url, "chat/completions")?,
            headers: Self::auth_headers(config)?,
            body: Some(body),
            stream,
        })
    }

    fn parse_response(&self, config: &ProviderConfig, raw: &str) -> Result<UniformResponse> {
        let parsed: ChatCompletion = serde_json::from_str(raw)
            .map_err(|e| Error::invalid_response(format!("malformed chat completion: {}", e), raw))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::invalid_response("chat completion has no choices", raw))?;
        let message = choice
            .message
            .ok_or_else(|| Error::invalid_response("first choice has no message", raw))?;

        Ok(UniformResponse {
            content: message.content.map(content_text).unwrap_or_default(),
            model: parsed
                .model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| config.model.clone()),
            total_tokens: parsed.usage.and_then(|u| u.total_tokens),
            finish_reason: choice.finish_reason,
        })
    }

    fn apply_stream_line(
        &self,
        acc: &mut StreamAccumulator,
        line: &str,
        on_token: &mut dyn FnMut(&str),
    ) -> FrameFlow {
        let Some(data) = sse_data(line) else {
            return FrameFlow::Continue;
        };
        let data = data.trim();
        if data == DONE_SIGNAL {
            return FrameFlow::Done;
        }
        if data.is_empty() {
            return FrameFlow::Continue;
        }

        let chunk: ChatChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!(error = %e, "skipping malformed chat completion chunk");
                return FrameFlow::Continue;
            }
        };

        acc.set_model(chunk.model);
        if let Some(total) = chunk.usage.and_then(|u| u.total_tokens) {
            acc.total_tokens = Some(total);
        }
        if let Some(choice) = chunk.choices.into_iter().next() {
            if let Some(text) = choice.delta.and_then(|d| d.content) {
                acc.push_text(&text, on_token);
            }
            if let Some(reason) = choice.finish_reason {
                acc.finish_reason = Some(reason);
            }
        }
        FrameFlow::Continue
    }
}

/// `content` is a string on OpenAI, but some compatible servers return text parts.
fn content_text(content: Value) -> String {
    match content {
        Value::String(s) => s,
        Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect(),
        _ => String::new(),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}
