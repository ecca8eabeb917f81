//! Small helpers shared by the drivers and the error type.

pub mod image;

pub use image::EncodedImage;

/// Cut `text` down to at most `limit` characters, marking the cut with an ellipsis.
///
/// Works on char boundaries so multi-byte bodies never panic.
pub fn truncate_for_display(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
