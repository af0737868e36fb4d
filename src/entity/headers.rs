//! Mapping between entity metadata and header fields.
//!
//! # Responsibilities
//! - Render an entity's metadata as response headers
//! - Read the request-side subset (type, length, encoding) from headers
//!
//! # Design Decisions
//! - Only `Content-Type`, `Content-Length` and `Content-Encoding` are read
//!   from requests; freshness headers in a request are left to the app
//! - An unparseable `Content-Type` is treated as absent, an unparseable
//!   `Content-Length` is an error since body framing depends on it

use crate::entity::contract::HttpEntity;
use crate::entity::etag::to_wire;
use crate::entity::meta::EntityMeta;
use crate::error::{EntityError, HeaderError};
use crate::headers::{
    HeaderMap, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG, EXPIRES, LAST_MODIFIED,
};

/// Write every known piece of entity metadata into `headers`.
pub fn write_entity_headers<E>(entity: &E, headers: &mut HeaderMap) -> Result<(), HeaderError>
where
    E: HttpEntity + ?Sized,
{
    if let Some(content_type) = entity.content_type() {
        headers.insert(CONTENT_TYPE, content_type.as_ref())?;
    }
    if let Some(length) = entity.content_length() {
        headers.insert(CONTENT_LENGTH, length.to_string())?;
    }
    if let Some(encoding) = entity.content_encoding() {
        headers.insert(CONTENT_ENCODING, encoding)?;
    }
    if let Some(time) = entity.last_modified() {
        headers.insert(LAST_MODIFIED, httpdate::fmt_http_date(time))?;
    }
    if let Some(time) = entity.expires() {
        headers.insert(EXPIRES, httpdate::fmt_http_date(time))?;
    }
    if let Some(tag) = entity.etag() {
        headers.insert(ETAG, to_wire(&tag, entity.etag_is_weak()))?;
    }
    Ok(())
}

/// Build request entity metadata from request headers.
pub fn read_request_entity_meta(headers: &HeaderMap) -> Result<EntityMeta, EntityError> {
    let mut meta = EntityMeta::new().with_content_length(parse_content_length(headers)?);

    if let Some(raw) = headers.get(CONTENT_TYPE) {
        match raw.parse() {
            Ok(content_type) => meta = meta.with_content_type(content_type),
            Err(_) => tracing::debug!(content_type = %raw, "Ignoring unparseable Content-Type"),
        }
    }

    if let Some(raw) = headers.get(CONTENT_ENCODING) {
        let encoding = raw.trim();
        if !encoding.is_empty() && !encoding.eq_ignore_ascii_case("identity") {
            meta = meta.with_content_encoding(encoding.to_ascii_lowercase());
        }
    }

    Ok(meta)
}

/// `Content-Length` as a number. Repeated identical values are accepted.
pub fn parse_content_length(headers: &HeaderMap) -> Result<Option<u64>, EntityError> {
    let Some(raw) = headers.get(CONTENT_LENGTH) else {
        return Ok(None);
    };
    let mut parsed: Option<u64> = None;
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EntityError::InvalidContentLength(raw.to_string()));
        }
        let value: u64 = part
            .parse()
            .map_err(|_| EntityError::InvalidContentLength(raw.to_string()))?;
        match parsed {
            Some(prev) if prev != value => {
                return Err(EntityError::InvalidContentLength(raw.to_string()))
            }
            _ => parsed = Some(value),
        }
    }
    Ok(parsed)
}
