//! The uniform result returned by every provider.

use serde::{Deserialize, Serialize};

/// Provider-agnostic completion result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformResponse {
    /// Full response text, fragments concatenated in arrival order.
    pub content: String,
    /// Model id reported by the provider, or the configured id when absent.
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}
