//! HTTP transport: connection setup, status classification and line framing.

pub mod http;
pub mod lines;

pub use http::HttpTransport;
pub use lines::{lines, lines_from_bytes, LineStream};

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no response within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Other(String),
}
