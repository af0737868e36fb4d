//! Sharable in-memory entity.

use std::borrow::Cow;
use std::time::SystemTime;

use bytes::Bytes;
use mime::Mime;
use serde::Serialize;

use crate::entity::body::{Body, DEFAULT_CHUNK_SIZE};
use crate::entity::contract::HttpEntity;
use crate::entity::etag::EntityTag;
use crate::entity::meta::EntityMeta;
use crate::error::EntityError;

/// An entity over an in-memory buffer.
///
/// Sharable: every [`HttpEntity::body`] call returns a new body over the
/// same immutable buffer, so it can be cached and served to many responses.
#[derive(Debug, Clone)]
pub struct BytesEntity {
    bytes: Bytes,
    meta: EntityMeta,
    chunk_size: usize,
    head: bool,
}

impl BytesEntity {
    /// Entity over `bytes` with `content_length` set to its length.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let meta = EntityMeta::new().with_content_length(Some(bytes.len() as u64));
        Self {
            bytes,
            meta,
            chunk_size: DEFAULT_CHUNK_SIZE,
            head: false,
        }
    }

    /// UTF-8 `text/plain` entity.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text.into()).with_content_type(mime::TEXT_PLAIN_UTF_8)
    }

    /// `application/json` entity.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        Ok(Self::new(bytes).with_content_type(mime::APPLICATION_JSON))
    }

    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.meta = self.meta.with_content_type(content_type);
        self
    }

    /// Mark the buffer as already encoded (e.g. gzip bytes).
    pub fn with_content_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.meta = self.meta.with_content_encoding(encoding);
        self
    }

    pub fn with_last_modified(mut self, time: SystemTime) -> Self {
        self.meta = self.meta.with_last_modified(time);
        self
    }

    pub fn with_expires(mut self, time: SystemTime) -> Self {
        self.meta = self.meta.with_expires(time);
        self
    }

    pub fn with_etag(mut self, etag: EntityTag) -> Self {
        self.meta = self.meta.with_etag(etag);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Variant for answering HEAD: same metadata, including the would-be
    /// `content_length`, but every body is empty.
    pub fn for_head(mut self) -> Self {
        self.head = true;
        self
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

impl HttpEntity for BytesEntity {
    fn body(&self) -> Result<Body, EntityError> {
        if self.head {
            return Ok(Body::empty());
        }
        Ok(Body::chunked(self.bytes.clone(), self.chunk_size))
    }

    fn is_sharable(&self) -> bool {
        true
    }

    fn content_type(&self) -> Option<&Mime> {
        self.meta.content_type()
    }

    fn content_length(&self) -> Option<u64> {
        self.meta.content_length()
    }

    fn content_encoding(&self) -> Option<&str> {
        self.meta.content_encoding()
    }

    fn last_modified(&self) -> Option<SystemTime> {
        self.meta.last_modified()
    }

    fn expires(&self) -> Option<SystemTime> {
        self.meta.expires()
    }

    fn etag(&self) -> Option<Cow<'_, str>> {
        self.meta.etag()
    }

    fn etag_is_weak(&self) -> bool {
        self.meta.etag_is_weak()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    #[tokio::test]
    async fn concurrent_bodies_are_independent() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let entity = Arc::new(BytesEntity::new(payload.clone()).with_chunk_size(97));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let entity = Arc::clone(&entity);
                tokio::spawn(async move {
                    let mut body = entity.body().unwrap();
                    let mut seen = Vec::new();
                    while let Some(chunk) = body.read().await.unwrap() {
                        seen.extend_from_slice(&chunk);
                        tokio::task::yield_now().await;
                    }
                    seen
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), payload);
        }
    }

    #[tokio::test]
    async fn body_can_be_obtained_after_close() {
        let entity = BytesEntity::text("again");
        let mut first = entity.body().unwrap();
        first.close();
        assert_eq!(entity.body_string(10).await.unwrap(), "again");
        assert_eq!(entity.body_string(10).await.unwrap(), "again");
    }

    #[tokio::test]
    async fn head_variant_keeps_length_with_empty_body() {
        let entity = BytesEntity::text("twelve bytes").for_head();
        assert_eq!(entity.content_length(), Some(12));
        assert_eq!(entity.body_bytes(100).await.unwrap().len(), 0);
    }

    #[test]
    fn metadata_round_trip() {
        let t = UNIX_EPOCH + Duration::from_secs(1);
        let entity = BytesEntity::new(&b"\x1f\x8b"[..])
            .with_content_type(mime::TEXT_HTML)
            .with_content_encoding("gzip")
            .with_last_modified(t)
            .with_expires(t + Duration::from_secs(60));
        assert_eq!(entity.content_type(), Some(&mime::TEXT_HTML));
        assert_eq!(entity.content_length(), Some(2));
        assert_eq!(entity.content_encoding(), Some("gzip"));
        assert_eq!(entity.etag().as_deref(), Some("t-1-0.gzip"));
        assert!(!entity.etag_is_weak());
        assert!(entity.is_sharable());
    }

    #[test]
    fn json_sets_content_type() {
        let entity = BytesEntity::json(&serde_json::json!({"ok": true})).unwrap();
        assert_eq!(entity.content_type(), Some(&mime::APPLICATION_JSON));
        assert_eq!(entity.bytes().as_ref(), b"{\"ok\":true}");
    }
}
