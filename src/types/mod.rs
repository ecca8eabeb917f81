//! Provider-agnostic data model shared by every driver.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Conversation turn with optional raw image bytes |
//! | [`ProviderKind`] | Supported providers and their default model tables |
//! | [`Dialect`] | Wire schema family spoken by a provider |
//! | [`ProviderConfig`] | Credential, model and sampling settings |
//! | [`UniformResponse`] | Result of a completed call |

pub mod config;
pub mod message;
pub mod provider;
pub mod response;

pub use config::ProviderConfig;
pub use message::{Message, MessageRole};
pub use provider::{Dialect, ProviderKind};
pub use response::UniformResponse;
