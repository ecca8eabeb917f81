//! 流式响应体的按行分帧。
//!
//! Pull-based line framing over a chunked response body.
//!
//! Bytes are buffered until a `\n` arrives, so multi-byte characters split across
//! chunks are reassembled before decoding. One item is produced per line, in order.

use crate::{BoxStream, Error};
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;

/// Longest line accepted before the stream is failed; a body that never sends `\n`
/// cannot grow the buffer past this.
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Finite, non-restartable sequence of body lines (without the trailing `\r\n`).
pub type LineStream = BoxStream<'static, String>;

/// Frame a reqwest response body into lines.
pub fn lines(response: reqwest::Response) -> LineStream {
    lines_from_bytes(response.bytes_stream())
}

struct LineState<S> {
    input: Pin<Box<S>>,
    buf: Vec<u8>,
    finished: bool,
}

/// Frame any chunk stream into lines. A chunk error, or a line longer than
/// [`MAX_LINE_BYTES`], ends the stream with `StreamingError`.
pub fn lines_from_bytes<S, E>(input: S) -> LineStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    lines_with_limit(input, MAX_LINE_BYTES)
}

fn lines_with_limit<S, E>(input: S, max_line: usize) -> LineStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = LineState {
        input: Box::pin(input),
        buf: Vec::new(),
        finished: false,
    };

    let stream = stream::unfold(state, move |mut st| async move {
        loop {
            if let Some(pos) = st.buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = st.buf.drain(..=pos).collect();
                return Some((Ok(decode_line(&raw[..raw.len() - 1])), st));
            }

            if st.finished {
                if st.buf.is_empty() {
                    return None;
                }
                // EOF without a trailing newline: flush the remainder once.
                let raw = std::mem::take(&mut st.buf);
                return Some((Ok(decode_line(&raw)), st));
            }

            if st.buf.len() > max_line {
                st.finished = true;
                st.buf.clear();
                return Some((
                    Err(Error::StreamingError(format!(
                        "line exceeds {} bytes without a newline",
                        max_line
                    ))),
                    st,
                ));
            }

            match st.input.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    st.finished = true;
                    st.buf.clear();
                    return Some((
                        Err(Error::StreamingError(format!("response body interrupted: {}", e))),
                        st,
                    ));
                }
                None => st.finished = true,
            }
        }
    });

    Box::pin(stream)
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
