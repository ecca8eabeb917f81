//! Provider drivers: per-dialect request building and response decoding.
//!
//! A driver is pure: it turns the uniform model into a [`DriverRequest`] and turns
//! response bodies (whole, or one streamed line at a time) back into the uniform
//! model. Network I/O lives in the client and transport layers.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use reqwest::header::HeaderValue;
use reqwest::{header::HeaderMap, Method};
use serde_json::Value;
use std::fmt;
use url::Url;

use crate::types::{Dialect, Message, ProviderConfig, ProviderKind, UniformResponse};
use crate::{Error, Result};

pub use anthropic::AnthropicDriver;
pub use gemini::GeminiDriver;
pub use openai::OpenAiDriver;

/// Text of the user turn substituted when a request would otherwise carry no turns.
pub const PLACEHOLDER_TURN_TEXT: &str = "Hello";

/// A fully resolved HTTP request for one provider call.
#[derive(Debug, Clone)]
pub struct DriverRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// JSON body; `None` for GET requests.
    pub body: Option<Value>,
    pub stream: bool,
}

/// Whether the stream fold should keep reading lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFlow {
    Continue,
    /// A terminal marker was seen; remaining lines must not be read.
    Done,
}

/// Running state of one streaming call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StreamAccumulator {
    pub content: String,
    pub model: Option<String>,
    pub finish_reason: Option<String>,
    pub total_tokens: Option<u64>,
    /// Prompt-side usage, for dialects that report it separately from output usage.
    pub prompt_tokens: Option<u64>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a text fragment to the callback and append it to the content buffer.
    pub fn push_text(&mut self, text: &str, on_token: &mut dyn FnMut(&str)) {
        if text.is_empty() {
            return;
        }
        on_token(text);
        self.content.push_str(text);
    }

    pub fn set_model(&mut self, model: Option<String>) {
        if let Some(m) = model.filter(|m| !m.is_empty()) {
            self.model = Some(m);
        }
    }

    pub fn into_response(self, fallback_model: &str) -> UniformResponse {
        UniformResponse {
            content: self.content,
            model: self.model.unwrap_or_else(|| fallback_model.to_string()),
            total_tokens: self.total_tokens,
            finish_reason: self.finish_reason,
        }
    }
}

/// Per-dialect wire adaptation.
///
/// Each wire dialect (OpenAI-compatible, Anthropic, Gemini) has a concrete
/// implementation; the client selects one through [`create_driver`].
pub trait ProviderDriver: Send + Sync + fmt::Debug {
    fn dialect(&self) -> Dialect;

    /// Cheap authenticated request used to check a credential.
    fn validation_request(&self, config: &ProviderConfig) -> Result<DriverRequest>;

    /// Build a completion request from the uniform config and turns.
    fn build_request(
        &self,
        config: &ProviderConfig,
        messages: &[Message],
        stream: bool,
    ) -> Result<DriverRequest>;

    /// Decode a complete (non-streaming) success body.
    fn parse_response(&self, config: &ProviderConfig, raw: &str) -> Result<UniformResponse>;

    /// Fold one body line into the accumulator, emitting text through `on_token`.
    ///
    /// Malformed frames are skipped; only terminal markers return [`FrameFlow::Done`].
    fn apply_stream_line(
        &self,
        acc: &mut StreamAccumulator,
        line: &str,
        on_token: &mut dyn FnMut(&str),
    ) -> FrameFlow;

    /// Convert the accumulator into the final response once the stream is over.
    fn finish_stream(&self, acc: StreamAccumulator, config: &ProviderConfig) -> UniformResponse {
        acc.into_response(&config.model)
    }

    /// Whether the dialect ends its streams with an explicit terminal marker.
    fn has_terminal_marker(&self) -> bool {
        true
    }
}

/// Map a provider kind to its driver. OpenAI and Grok share [`OpenAiDriver`],
/// differing only in base URL.
pub fn create_driver(kind: ProviderKind, base_url: &str) -> Box<dyn ProviderDriver> {
    match kind.dialect() {
        Dialect::OpenAiCompatible => Box::new(OpenAiDriver::new(base_url)),
        Dialect::AnthropicMessages => Box::new(AnthropicDriver::new(base_url)),
        Dialect::GeminiGenerate => Box::new(GeminiDriver::new(base_url)),
    }
}

/// Clamp into `[0, max]`. NaN maps to 0. Idempotent.
pub fn clamp_temperature(temperature: f64, max: f64) -> f64 {
    if temperature.is_nan() {
        0.0
    } else {
        temperature.clamp(0.0, max)
    }
}

/// Payload of an SSE `data:` line, or `None` for any other line.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Join `base` and `path`, rejecting anything that is not an http(s) URL.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let url = Url::parse(&joined).map_err(|e| Error::InvalidEndpoint(format!("{}: {}", base, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::InvalidEndpoint(format!(
            "{}: expected an http(s) URL with a host",
            base
        )));
    }
    Ok(url)
}

/// The credential, trimmed. Blank credentials are rejected before any request is sent.
pub(crate) fn api_key(config: &ProviderConfig) -> Result<&str> {
    let key = config.api_key.trim();
    if key.is_empty() {
        return Err(Error::InvalidApiKey(format!(
            "no API key configured for {}",
            config.kind.display_name()
        )));
    }
    Ok(key)
}

/// Header value carrying a credential; control characters are rejected.
pub(crate) fn credential_header(value: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value).map_err(|_| {
        Error::InvalidApiKey("API key contains characters not allowed in an HTTP header".into())
    })?;
    header.set_sensitive(true);
    Ok(header)
}

/// Join the config's system prompt with the text of any system-role turns.
pub(crate) fn merged_system_text(config: &ProviderConfig, messages: &[Message]) -> String {
    std::iter::once(config.system_prompt.as_str())
        .chain(messages.iter().filter(|m| m.is_system()).map(|m| m.content.as_str()))
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
