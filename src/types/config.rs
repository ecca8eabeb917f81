//! Provider configuration: programmatic builder, environment and YAML loading.

use keyring::Entry;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;

use super::provider::ProviderKind;
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Keyring service name under which credentials are looked up (user = provider id).
pub const KEYRING_SERVICE: &str = "ai-lib-vision";

/// Everything a client needs to talk to one provider.
///
/// A client owns its config; swap it wholesale with `LlmClient::set_config`.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Override the provider's default endpoint (proxies, gateways, mock servers).
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// New config using the kind's first default model.
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            model: kind.default_model().to_string(),
            system_prompt: String::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            base_url: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// `None` (or a blank id) resets to the kind's default model.
    pub fn with_optional_model(mut self, model: Option<String>) -> Self {
        self.model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.kind.default_model().to_string());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    /// Stored as given; each driver clamps to its own accepted range.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Endpoint root for requests: the override if set, otherwise the kind's default.
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
    }

    /// Build a config from the OS keyring and environment variables.
    ///
    /// The credential comes from the keyring (`ai-lib-vision` / provider id) or the
    /// provider's conventional variable (e.g. `OPENAI_API_KEY`). Optional overrides:
    /// `AI_VISION_MODEL`, `AI_VISION_MAX_TOKENS`, `AI_VISION_TEMPERATURE`,
    /// `AI_VISION_BASE_URL`, `AI_VISION_SYSTEM_PROMPT`.
    pub fn from_env(kind: ProviderKind) -> Result<Self> {
        Self::from_lookup(kind, |name| env::var(name).ok(), keyring_api_key)
    }

    fn from_lookup(
        kind: ProviderKind,
        var: impl Fn(&str) -> Option<String>,
        keyring: impl Fn(ProviderKind) -> Option<String>,
    ) -> Result<Self> {
        let api_key = keyring(kind)
            .or_else(|| var(kind.api_key_env()))
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| missing_api_key(kind, "env"))?;

        let mut config = Self::new(kind, api_key).with_optional_model(var("AI_VISION_MODEL"));
        if let Some(raw) = var("AI_VISION_MAX_TOKENS") {
            config.max_tokens = parse_max_tokens(&raw, "AI_VISION_MAX_TOKENS", "env")?;
        }
        if let Some(raw) = var("AI_VISION_TEMPERATURE") {
            config.temperature = parse_temperature(&raw, "AI_VISION_TEMPERATURE", "env")?;
        }
        if let Some(url) = var("AI_VISION_BASE_URL").filter(|u| !u.trim().is_empty()) {
            config.base_url = Some(url);
        }
        if let Some(prompt) = var("AI_VISION_SYSTEM_PROMPT") {
            config.system_prompt = prompt;
        }
        Ok(config)
    }

    /// Parse a YAML document such as:
    ///
    /// ```yaml
    /// provider: anthropic
    /// model: claude-3-5-sonnet-20241022
    /// max_tokens: 2048
    /// temperature: 0.2
    /// ```
    ///
    /// A missing `api_key` is resolved from the keyring or environment.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                "failed to parse provider config",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("yaml"),
            )
        })?;
        file.into_config(|kind| {
            keyring_api_key(kind).or_else(|| env::var(kind.api_key_env()).ok())
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read {}", path.display()),
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("yaml"),
            )
        })?;
        Self::from_yaml_str(&raw)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("system_prompt_len", &self.system_prompt.len())
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    provider: ProviderKind,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    base_url: Option<String>,
}

impl ConfigFile {
    fn into_config(
        self,
        resolve_key: impl Fn(ProviderKind) -> Option<String>,
    ) -> Result<ProviderConfig> {
        let kind = self.provider;
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| resolve_key(kind))
            .ok_or_else(|| missing_api_key(kind, "yaml"))?;

        let mut config = ProviderConfig::new(kind, api_key).with_optional_model(self.model);
        if let Some(n) = self.max_tokens {
            if n == 0 {
                return Err(Error::configuration_with_context(
                    "max_tokens must be a positive integer",
                    ErrorContext::new()
                        .with_field_path("max_tokens")
                        .with_source("yaml"),
                ));
            }
            config.max_tokens = n;
        }
        if let Some(t) = self.temperature {
            if !t.is_finite() {
                return Err(Error::configuration_with_context(
                    "temperature must be a finite number",
                    ErrorContext::new()
                        .with_field_path("temperature")
                        .with_source("yaml"),
                ));
            }
            config.temperature = t;
        }
        if let Some(prompt) = self.system_prompt {
            config.system_prompt = prompt;
        }
        config.base_url = self.base_url;
        Ok(config)
    }
}

fn keyring_api_key(kind: ProviderKind) -> Option<String> {
    Entry::new(KEYRING_SERVICE, kind.id())
        .ok()
        .and_then(|entry| entry.get_password().ok())
}

fn missing_api_key(kind: ProviderKind, source: &str) -> Error {
    Error::configuration_with_context(
        format!("no API key found for {}", kind.display_name()),
        ErrorContext::new()
            .with_field_path(kind.api_key_env())
            .with_details(format!("set {} or store it in the keyring", kind.api_key_env()))
            .with_source(source),
    )
}

fn parse_max_tokens(raw: &str, field: &str, source: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::configuration_with_context(
            "max_tokens must be a positive integer",
            ErrorContext::new()
                .with_field_path(field)
                .with_details(format!("got '{}'", raw))
                .with_source(source),
        )),
    }
}

fn parse_temperature(raw: &str, field: &str, source: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(t) if t.is_finite() => Ok(t),
        _ => Err(Error::configuration_with_context(
            "temperature must be a finite number",
            ErrorContext::new()
                .with_field_path(field)
                .with_details(format!("got '{}'", raw))
                .with_source(source),
        )),
    }
}
