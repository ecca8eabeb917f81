//! # ai-lib-vision
//!
//! Streaming, vision-capable chat client for several LLM backends behind one
//! uniform interface.
//!
//! ## Overview
//!
//! Callers describe a conversation once, with [`Message`] turns that may carry
//! a screenshot, and a [`ProviderConfig`]. The crate maps that onto one of three
//! wire dialects and decodes the reply back into a [`UniformResponse`]:
//!
//! - **OpenAI-compatible** chat completions (OpenAI, and xAI Grok on its own base URL)
//! - **Anthropic** Messages API
//! - **Google Gemini** `generateContent`
//!
//! Streaming responses are read one line at a time; each decoded text delta is
//! handed to a callback in arrival order before the accumulated response is returned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_lib_vision::{create_client, ChatProvider, Message, ProviderConfig, ProviderKind};
//!
//! #[tokio::main]
//! async fn main() -> ai_lib_vision::Result<()> {
//!     let config = ProviderConfig::new(ProviderKind::Anthropic, "sk-ant-...")
//!         .with_system_prompt("You describe UI screenshots.");
//!     let client = create_client(config)?;
//!
//!     let screenshot = std::fs::read("screen.png").unwrap_or_default();
//!     let messages = vec![Message::user("Where is the search box?").with_image(screenshot)];
//!
//!     let reply = client
//!         .send_streaming(&messages, &mut |token: &str| print!("{token}"))
//!         .await?;
//!     println!("\n[{} tokens]", reply.total_tokens.unwrap_or(0));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Messages, provider kinds, configuration and the uniform response |
//! | [`drivers`] | Per-dialect request building and response decoding |
//! | [`transport`] | reqwest connection, status classification, line framing |
//! | [`client`] | [`ChatProvider`] trait, [`LlmClient`] and the factory |
//! | [`error`] | Error type shared by every module |

pub mod client;
pub mod drivers;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use client::{create_client, ChatProvider, LlmClient};
pub use types::{
    message::{Message, MessageRole},
    Dialect, ProviderConfig, ProviderKind, UniformResponse,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
