//! Supported providers, their wire dialects and default model tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const OPENAI_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini", "gpt-4.1", "gpt-4-turbo"];
const ANTHROPIC_MODELS: &[&str] = &[
    "claude-sonnet-4-20250514",
    "claude-3-7-sonnet-20250219",
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
];
const GEMINI_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-1.5-pro", "gemini-1.5-flash"];
const GROK_MODELS: &[&str] = &["grok-2-vision-1212", "grok-vision-beta"];

/// The wire schema family a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `/chat/completions` with bearer auth (OpenAI, Grok).
    OpenAiCompatible,
    /// Anthropic Messages API.
    AnthropicMessages,
    /// Google Gemini `generateContent`.
    GeminiGenerate,
}

/// Closed set of supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    #[serde(alias = "google")]
    Gemini,
    #[serde(alias = "xai")]
    Grok,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
        ProviderKind::Grok,
    ];

    pub fn dialect(&self) -> Dialect {
        match self {
            ProviderKind::OpenAi | ProviderKind::Grok => Dialect::OpenAiCompatible,
            ProviderKind::Anthropic => Dialect::AnthropicMessages,
            ProviderKind::Gemini => Dialect::GeminiGenerate,
        }
    }

    /// Known model identifiers, most preferred first. Never empty.
    pub fn default_models(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::OpenAi => OPENAI_MODELS,
            ProviderKind::Anthropic => ANTHROPIC_MODELS,
            ProviderKind::Gemini => GEMINI_MODELS,
            ProviderKind::Grok => GROK_MODELS,
        }
    }

    pub fn default_model(&self) -> &'static str {
        self.default_models()[0]
    }

    /// Every supported provider accepts image input.
    pub fn supports_vision(&self) -> bool {
        true
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::Grok => "https://api.x.ai/v1",
        }
    }

    /// Environment variable conventionally holding the provider credential.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Grok => "XAI_API_KEY",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Grok => "grok",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Gemini => "Google Gemini",
            ProviderKind::Grok => "xAI Grok",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "grok" | "xai" => Ok(ProviderKind::Grok),
            other => Err(crate::Error::configuration_with_context(
                format!("unknown provider '{}'", other),
                crate::ErrorContext::new()
                    .with_field_path("provider")
                    .with_details("expected one of: openai, anthropic, gemini, grok"),
            )),
        }
    }
}
