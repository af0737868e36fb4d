//! Entity body streams.
//!
//! A [`Body`] is a sequential source of byte chunks. Reads are the only
//! suspension points; obtaining a body never performs I/O. Closing is
//! idempotent and may happen at any time, including mid-read.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use encoding_rs::{CoderResult, Decoder, Encoding};
use futures_util::{stream, Stream, StreamExt};

use crate::error::EntityError;
use crate::observability::metrics;

/// Default chunk size for in-memory bodies (64 KB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A type-erased, fallible stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, EntityError>> + Send>>;

/// A readable, closable body.
pub struct Body {
    stream: Option<ByteStream>,
}

impl Body {
    /// A body with no bytes.
    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }

    /// A body over an in-memory buffer, yielded in [`DEFAULT_CHUNK_SIZE`] chunks.
    pub fn from_bytes(buf: impl Into<Bytes>) -> Self {
        Self::chunked(buf.into(), DEFAULT_CHUNK_SIZE)
    }

    /// A body over an in-memory buffer, yielded in `chunk_size` chunks.
    pub fn chunked(buf: Bytes, chunk_size: usize) -> Self {
        Self::from_stream(ChunkedBytesStream::new(buf, chunk_size))
    }

    /// A body over an arbitrary chunk stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, EntityError>> + Send + 'static,
    {
        Self {
            stream: Some(Box::pin(stream)),
        }
    }

    /// Read the next chunk. `Ok(None)` signals end of data.
    ///
    /// Empty chunks from the underlying stream are skipped.
    pub async fn read(&mut self) -> Result<Option<Bytes>, EntityError> {
        let stream = self.stream.as_mut().ok_or(EntityError::Closed)?;
        loop {
            match stream.next().await {
                Some(Ok(chunk)) if chunk.is_empty() => continue,
                Some(Ok(chunk)) => return Ok(Some(chunk)),
                Some(Err(e)) => return Err(e),
                None => return Ok(None),
            }
        }
    }

    /// Release the underlying stream. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.stream = None;
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Read every remaining byte, failing past `max_bytes`.
    pub async fn read_all(mut self, max_bytes: usize) -> Result<Bytes, EntityError> {
        let mut first: Option<Bytes> = None;
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.read().await? {
            let total = first.as_ref().map_or(0, Bytes::len) + buf.len() + chunk.len();
            if total > max_bytes {
                self.close();
                metrics::record_body_limit_exceeded();
                tracing::debug!(limit = max_bytes, "Body exceeded byte limit");
                return Err(EntityError::BodyTooLarge { limit: max_bytes });
            }
            // Single-chunk bodies are returned without copying.
            match first.take() {
                None if buf.is_empty() => first = Some(chunk),
                None => buf.extend_from_slice(&chunk),
                Some(prev) => {
                    buf.extend_from_slice(&prev);
                    buf.extend_from_slice(&chunk);
                }
            }
        }
        self.close();
        Ok(first.unwrap_or_else(|| buf.freeze()))
    }

    /// Decode every remaining byte as text, failing past `max_chars` characters.
    ///
    /// Malformed sequences decode to U+FFFD. A leading byte-order mark is kept.
    pub async fn read_string(
        mut self,
        max_chars: usize,
        encoding: &'static Encoding,
    ) -> Result<String, EntityError> {
        let mut decoder = encoding.new_decoder_without_bom_handling();
        let mut text = String::new();
        let mut chars = 0usize;
        loop {
            let chunk = self.read().await?;
            let last = chunk.is_none();
            let start = text.len();
            decode_into(&mut decoder, chunk.as_deref().unwrap_or(&[]), &mut text, last);
            chars += text[start..].chars().count();
            if chars > max_chars {
                self.close();
                metrics::record_body_limit_exceeded();
                tracing::debug!(limit = max_chars, "Body exceeded character limit");
                return Err(EntityError::BodyTooLarge { limit: max_chars });
            }
            if last {
                break;
            }
        }
        self.close();
        Ok(text)
    }
}

fn decode_into(decoder: &mut Decoder, mut input: &[u8], out: &mut String, last: bool) {
    loop {
        let needed = decoder
            .max_utf8_buffer_length(input.len())
            .unwrap_or(input.len() * 3 + 16);
        out.reserve(needed);
        let (result, read, _replaced) = decoder.decode_to_string(input, out, last);
        input = &input[read..];
        match result {
            CoderResult::InputEmpty => return,
            CoderResult::OutputFull => continue,
        }
    }
}

impl Stream for Body {
    type Item = Result<Bytes, EntityError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut().stream.as_mut() {
            Some(stream) => stream.as_mut().poll_next(cx),
            None => Poll::Ready(None),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Yields a `Bytes` buffer in fixed-size chunks without copying.
///
/// Each chunk is a `Bytes::slice()` sharing the original allocation, so
/// concurrent bodies over the same buffer never share a read position.
struct ChunkedBytesStream {
    buf: Bytes,
    chunk_size: usize,
    offset: usize,
}

impl ChunkedBytesStream {
    fn new(buf: Bytes, chunk_size: usize) -> Self {
        Self {
            buf,
            chunk_size: chunk_size.max(1),
            offset: 0,
        }
    }
}

impl Stream for ChunkedBytesStream {
    type Item = Result<Bytes, EntityError>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.offset >= this.buf.len() {
            return Poll::Ready(None);
        }
        let end = std::cmp::min(this.offset + this.chunk_size, this.buf.len());
        let chunk = this.buf.slice(this.offset..end);
        this.offset = end;
        Poll::Ready(Some(Ok(chunk)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_body_ends_immediately() {
        let mut body = Body::empty();
        assert_eq!(body.read().await, Ok(None));
    }

    #[tokio::test]
    async fn chunked_body_yields_slices_in_order() {
        let mut body = Body::chunked(Bytes::from_static(b"abcdefg"), 3);
        assert_eq!(body.read().await.unwrap().as_deref(), Some(&b"abc"[..]));
        assert_eq!(body.read().await.unwrap().as_deref(), Some(&b"def"[..]));
        assert_eq!(body.read().await.unwrap().as_deref(), Some(&b"g"[..]));
        assert_eq!(body.read().await, Ok(None));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_stops_reads() {
        let mut body = Body::from_bytes("hello");
        body.close();
        body.close();
        assert!(body.is_closed());
        assert_eq!(body.read().await, Err(EntityError::Closed));
    }

    #[tokio::test]
    async fn read_all_enforces_limit() {
        let body = Body::chunked(Bytes::from_static(b"0123456789"), 4);
        assert_eq!(
            body.read_all(9).await,
            Err(EntityError::BodyTooLarge { limit: 9 })
        );

        let body = Body::chunked(Bytes::from_static(b"0123456789"), 4);
        assert_eq!(body.read_all(10).await.unwrap(), Bytes::from_static(b"0123456789"));
    }

    #[tokio::test]
    async fn read_all_skips_empty_chunks() {
        let chunks = vec![
            Ok(Bytes::new()),
            Ok(Bytes::from_static(b"ab")),
            Ok(Bytes::new()),
            Ok(Bytes::from_static(b"c")),
        ];
        let body = Body::from_stream(stream::iter(chunks));
        assert_eq!(body.read_all(16).await.unwrap(), Bytes::from_static(b"abc"));
    }

    #[tokio::test]
    async fn stream_errors_propagate() {
        let chunks = vec![
            Ok(Bytes::from_static(b"ab")),
            Err(EntityError::Stream("reset".into())),
        ];
        let body = Body::from_stream(stream::iter(chunks));
        assert_eq!(
            body.read_all(16).await,
            Err(EntityError::Stream("reset".into()))
        );
    }

    #[tokio::test]
    async fn read_string_decodes_split_multibyte_sequences() {
        // "é" is 0xC3 0xA9 in UTF-8; split it across chunks.
        let chunks = vec![
            Ok(Bytes::from_static(&[b'c', b'a', b'f', 0xC3])),
            Ok(Bytes::from_static(&[0xA9])),
        ];
        let body = Body::from_stream(stream::iter(chunks));
        assert_eq!(body.read_string(4, encoding_rs::UTF_8).await.unwrap(), "café");
    }

    #[tokio::test]
    async fn read_string_counts_characters_not_bytes() {
        let body = Body::from_bytes("héllo");
        assert_eq!(
            body.read_string(4, encoding_rs::UTF_8).await,
            Err(EntityError::BodyTooLarge { limit: 4 })
        );
    }

    #[tokio::test]
    async fn read_string_uses_given_charset() {
        let body = Body::from_bytes(Bytes::from_static(&[0x63, 0x61, 0x66, 0xE9]));
        assert_eq!(
            body.read_string(16, encoding_rs::WINDOWS_1252).await.unwrap(),
            "café"
        );
    }
}
