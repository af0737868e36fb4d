//! Single-use entity over one stream.

use std::borrow::Cow;
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use mime::Mime;

use crate::entity::body::Body;
use crate::entity::contract::HttpEntity;
use crate::entity::meta::EntityMeta;
use crate::error::EntityError;
use crate::observability::metrics;

/// A non-sharable entity, typically an inbound request body.
///
/// The body is handed out on the first [`HttpEntity::body`] call. Every
/// later call fails with [`EntityError::ReuseViolation`], whether or not the
/// first body was read or closed; the same stream is never handed out twice.
#[derive(Debug)]
pub struct StreamEntity {
    body: Mutex<Option<Body>>,
    meta: EntityMeta,
}

impl StreamEntity {
    pub fn new(body: Body, meta: EntityMeta) -> Self {
        Self {
            body: Mutex::new(Some(body)),
            meta,
        }
    }

    pub fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}

impl HttpEntity for StreamEntity {
    fn body(&self) -> Result<Body, EntityError> {
        let taken = self
            .body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        taken.ok_or_else(|| {
            tracing::warn!("Body of a single-use entity requested twice");
            metrics::record_reuse_violation();
            EntityError::ReuseViolation
        })
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

    fn entity(text: &'static str) -> StreamEntity {
        StreamEntity::new(Body::from_bytes(text), EntityMeta::new())
    }

    #[test]
    fn second_obtain_fails_after_unread_first() {
        let e = entity("x");
        let _first = e.body().unwrap();
        assert_eq!(e.body().unwrap_err(), EntityError::ReuseViolation);
    }

    #[tokio::test]
    async fn second_obtain_fails_after_read_or_close() {
        let e = entity("abc");
        assert_eq!(e.body_string(10).await.unwrap(), "abc");
        assert_eq!(e.body_string(10).await, Err(EntityError::ReuseViolation));

        let e = entity("abc");
        e.body().unwrap().close();
        assert_eq!(e.body_bytes(10).await, Err(EntityError::ReuseViolation));
        assert_eq!(e.body().unwrap_err(), EntityError::ReuseViolation);
    }

    #[test]
    fn not_sharable() {
        assert!(!entity("").is_sharable());
    }
}
