use crate::transport::TransportError;
use crate::utils::truncate_for_display;
use thiserror::Error;

/// Maximum number of characters of a response body echoed back in error messages.
pub const BODY_EXCERPT_LIMIT: usize = 512;

/// Structured error context for configuration failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field or configuration key that caused the error (e.g., "max_tokens", "AI_VISION_TEMPERATURE")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "yaml", "env", "keyring")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for every provider client.
///
/// Errors are surfaced to the immediate caller and never retried internally.
/// `RateLimited` is kept distinct from `ServerError` so that callers can
/// implement their own backoff.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("Rate limited by provider, try again later")]
    RateLimited,

    #[error("Server error: HTTP {status}: {}", truncate_for_display(.body, BODY_EXCERPT_LIMIT))]
    ServerError { status: u16, body: String },

    #[error("Failed to encode image: {0}")]
    ImageEncodingFailed(String),

    #[error("Streaming error: {0}")]
    StreamingError(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Build an `InvalidResponse` that carries an excerpt of the offending body.
    pub fn invalid_response(detail: impl AsRef<str>, raw_body: &str) -> Self {
        Error::InvalidResponse(format!(
            "{}; body: {}",
            detail.as_ref(),
            truncate_for_display(raw_body, BODY_EXCERPT_LIMIT)
        ))
    }

    /// Classify a non-success HTTP status. 429 is always `RateLimited`.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 429 {
            Error::RateLimited
        } else {
            Error::ServerError { status, body }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited)
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RateLimited => Some(429),
            Error::ServerError { status, .. } => Some(*status),
            Error::Network(TransportError::Http(e)) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}
