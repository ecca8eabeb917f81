//! Google Gemini `generateContent` driver.
//!
//! - The API key is the `key` query parameter, not a header.
//! - Turns are `contents[*].parts`; the assistant role is `model`.
//! - System text goes to `systemInstruction.parts`; system-role turns are dropped.
//! - Sampling parameters live under `generationConfig`.
//! - Streaming uses `:streamGenerateContent?alt=sse`; every frame is a whole
//!   response object and there is no terminal marker.

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::{
    api_key, clamp_temperature, endpoint, merged_system_text, sse_data, DriverRequest, FrameFlow,
    ProviderDriver, StreamAccumulator, PLACEHOLDER_TURN_TEXT,
};
use crate::types::{Dialect, Message, MessageRole, ProviderConfig, UniformResponse};
use crate::utils::EncodedImage;
use crate::{Error, Result};

pub const MAX_TEMPERATURE: f64 = 2.0;

/// Google Gemini generateContent API driver.
#[derive(Debug, Clone)]
pub struct GeminiDriver {
    base_url: String,
}

impl GeminiDriver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn with_key(mut url: Url, config: &ProviderConfig) -> Result<Url> {
        url.query_pairs_mut().append_pair("key", api_key(config)?);
        Ok(url)
    }

    fn parts(message: &Message) -> Result<Vec<Value>> {
        let mut parts = Vec::with_capacity(2);
        // Empty text parts are rejected; an image alone is a valid turn.
        if !message.content.is_empty() || message.image.is_none() {
            parts.push(json!({ "text": message.content }));
        }
        if let Some(bytes) = &message.image {
            let image = EncodedImage::encode(bytes)?;
            parts.push(json!({
                "inline_data": {
                    "mime_type": image.media_type,
                    "data": image.data,
                }
            }));
        }
        Ok(parts)
    }

    fn build_contents(messages: &[Message]) -> Result<Vec<Value>> {
        let mut contents = Vec::with_capacity(messages.len());
        for message in messages {
            let role = match message.role {
                MessageRole::System => continue,
                MessageRole::User => "user",
                MessageRole::Assistant => "model",
            };
            contents.push(json!({ "role": role, "parts": Self::parts(message)? }));
        }
        if contents.is_empty() {
            contents.push(json!({
                "role": "user",
                "parts": [{ "text": PLACEHOLDER_TURN_TEXT }],
            }));
        }
        Ok(contents)
    }
}

impl ProviderDriver for GeminiDriver {
    fn dialect(&self) -> Dialect {
        Dialect::GeminiGenerate
    }

    fn validation_request(&self, config: &ProviderConfig) -> Result<DriverRequest> {
        Ok(DriverRequest {
            method: Method::GET,
            url: Self::with_key(endpoint(&self.base_url, "models")?, config)?,
            headers: HeaderMap::new(),
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
            "contents": Self::build_contents(messages)?,
            "generationConfig": {
                "maxOutputTokens": config.max_tokens,
                "temperature": clamp_temperature(config.temperature, MAX_TEMPERATURE),
            },
        });
        let system = merged_system_text(config, messages);
        if !system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        let method = if stream {
            "streamGenerateContent"
        } else {
            "generateContent"
        };
        let mut url = endpoint(&self.base_url, "models")?;
        // Pushed as one segment so `?`, `#` or `/` in a model id are percent-encoded.
        url.path_segments_mut()
            .map_err(|_| Error::InvalidEndpoint(format!("{}: cannot append a path", self.base_url)))?
            .pop_if_empty()
            .push(&format!("{}:{}", config.model, method));
        if stream {
            url.query_pairs_mut().append_pair("alt", "sse");
        }

        Ok(DriverRequest {
            method: Method::POST,
            url: Self::with_key(url, config)?,
            headers: HeaderMap::new(),
            body: Some(body),
            stream,
        })
    }

    fn parse_response(&self, config: &ProviderConfig, raw: &str) -> Result<UniformResponse> {
        let parsed: GenerateResponse = serde_json::from_str(raw)
            .map_err(|e| Error::invalid_response(format!("malformed generateContent response: {}", e), raw))?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::invalid_response("response has no candidates", raw))?;

        Ok(UniformResponse {
            content: candidate.text(),
            model: parsed
                .model_version
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| config.model.clone()),
            total_tokens: parsed.usage_metadata.and_then(|u| u.total_token_count),
            finish_reason: candidate.finish_reason,
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
        if data.trim().is_empty() {
            return FrameFlow::Continue;
        }

        let frame: GenerateResponse = match serde_json::from_str(data) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "skipping malformed gemini stream frame");
                return FrameFlow::Continue;
            }
        };

        acc.set_model(frame.model_version);
        if let Some(total) = frame.usage_metadata.and_then(|u| u.total_token_count) {
            acc.total_tokens = Some(total);
        }
        if let Some(candidate) = frame.candidates.into_iter().next() {
            if let Some(reason) = candidate.finish_reason {
                acc.finish_reason = Some(reason);
            }
            for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
                if let Some(text) = part.text {
                    acc.push_text(&text, on_token);
                }
            }
        }
        FrameFlow::Continue
    }

    fn has_terminal_marker(&self) -> bool {
        false
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

impl Candidate {
    fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    total_token_count: Option<u64>,
}
