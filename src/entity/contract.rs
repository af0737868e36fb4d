//! The entity capability set.

use std::borrow::Cow;
use std::fmt;
use std::time::SystemTime;

use bytes::Bytes;
use encoding_rs::Encoding;
use futures_util::future::{self, BoxFuture, FutureExt};
use mime::Mime;

use crate::entity::body::Body;
use crate::entity::etag::default_etag;
use crate::error::EntityError;

/// An HTTP entity: a body plus content and freshness metadata.
///
/// Every method is non-blocking. Metadata is kept apart from the body so a
/// driver can answer HEAD or set `Content-Length` without creating a body.
///
/// An entity is *sharable* when [`HttpEntity::body`] may be called any
/// number of times, possibly concurrently, each call returning a new,
/// independent body at its start. A non-sharable entity yields its body
/// exactly once; further calls fail with [`EntityError::ReuseViolation`].
pub trait HttpEntity: Send + Sync + fmt::Debug {
    /// Obtain the body. Ownership passes to the caller, who must read it to
    /// the end, close it, or drop it.
    ///
    /// The bytes yielded should total [`HttpEntity::content_length`] when
    /// that is known, except for a response to HEAD, whose body may be empty.
    fn body(&self) -> Result<Body, EntityError>;

    fn is_sharable(&self) -> bool {
        false
    }

    /// Read a fresh body in full, failing past `max_bytes`.
    fn body_bytes(&self, max_bytes: usize) -> BoxFuture<'static, Result<Bytes, EntityError>> {
        match self.body() {
            Ok(body) => body.read_all(max_bytes).boxed(),
            Err(e) => future::ready(Err(e)).boxed(),
        }
    }

    /// Decode a fresh body as text, failing past `max_chars` characters.
    ///
    /// Fails with [`EntityError::Encoding`] whenever a content encoding is
    /// set, before touching the body. The charset comes from the content
    /// type's `charset` parameter, UTF-8 when there is none.
    fn body_string(&self, max_chars: usize) -> BoxFuture<'static, Result<String, EntityError>> {
        let encoding = match text_charset(self) {
            Ok(encoding) => encoding,
            Err(e) => return future::ready(Err(e)).boxed(),
        };
        match self.body() {
            Ok(body) => body.read_string(max_chars, encoding).boxed(),
            Err(e) => future::ready(Err(e)).boxed(),
        }
    }

    fn content_type(&self) -> Option<&Mime> {
        None
    }

    fn content_length(&self) -> Option<u64> {
        None
    }

    fn content_encoding(&self) -> Option<&str> {
        None
    }

    /// Response only; request headers are never reflected here.
    fn last_modified(&self) -> Option<SystemTime> {
        None
    }

    /// Response only; request headers are never reflected here.
    fn expires(&self) -> Option<SystemTime> {
        None
    }

    /// The unquoted entity tag. Derived from [`HttpEntity::last_modified`]
    /// and [`HttpEntity::content_encoding`] by default.
    fn etag(&self) -> Option<Cow<'_, str>> {
        default_etag(self.last_modified(), self.content_encoding()).map(Cow::Owned)
    }

    fn etag_is_weak(&self) -> bool {
        false
    }
}

/// Charset for decoding `entity` as text.
pub fn text_charset<E: HttpEntity + ?Sized>(entity: &E) -> Result<&'static Encoding, EntityError> {
    if let Some(encoding) = entity.content_encoding() {
        return Err(EntityError::Encoding(encoding.to_string()));
    }
    let label = entity
        .content_type()
        .and_then(|ct| ct.get_param(mime::CHARSET))
        .map(|name| name.as_str().to_string());
    match label {
        None => Ok(encoding_rs::UTF_8),
        Some(label) => {
            Encoding::for_label_no_replacement(label.as_bytes())
                .ok_or(EntityError::Charset(label))
        }
    }
}
