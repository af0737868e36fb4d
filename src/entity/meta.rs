//! Entity metadata shared by the concrete entity types.

use std::borrow::Cow;
use std::time::SystemTime;

use mime::Mime;

use crate::entity::etag::{default_etag, EntityTag};
use crate::lazy::LazyView;

/// Content and freshness metadata of an entity.
///
/// Built with the `with_*` methods before the entity is shared. A tag not
/// set explicitly is derived from `last_modified` and `content_encoding` on
/// first access and cached.
#[derive(Debug, Clone, Default)]
pub struct EntityMeta {
    content_type: Option<Mime>,
    content_length: Option<u64>,
    content_encoding: Option<String>,
    last_modified: Option<SystemTime>,
    expires: Option<SystemTime>,
    etag: Option<EntityTag>,
    derived_etag: LazyView<Option<String>>,
}

impl EntityMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_content_length(mut self, length: Option<u64>) -> Self {
        self.content_length = length;
        self
    }

    pub fn with_content_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(encoding.into());
        self.derived_etag = LazyView::new();
        self
    }

    pub fn with_last_modified(mut self, time: SystemTime) -> Self {
        self.last_modified = Some(time);
        self.derived_etag = LazyView::new();
        self
    }

    pub fn with_expires(mut self, time: SystemTime) -> Self {
        self.expires = Some(time);
        self
    }

    pub fn with_etag(mut self, etag: EntityTag) -> Self {
        self.etag = Some(etag);
        self
    }

    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.content_encoding.as_deref()
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    pub fn expires(&self) -> Option<SystemTime> {
        self.expires
    }

    /// Explicit tag, else the cached derived tag.
    pub fn etag(&self) -> Option<Cow<'_, str>> {
        if let Some(tag) = &self.etag {
            return Some(Cow::Borrowed(tag.value()));
        }
        self.derived_etag
            .get_or_derive(|| default_etag(self.last_modified, self.content_encoding.as_deref()))
            .as_deref()
            .map(Cow::Borrowed)
    }

    /// Only an explicit tag can be weak.
    pub fn etag_is_weak(&self) -> bool {
        self.etag.as_ref().is_some_and(EntityTag::is_weak)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn derived_etag_follows_builder_changes() {
        let t = UNIX_EPOCH + Duration::from_secs(16);
        let meta = EntityMeta::new().with_last_modified(t);
        assert_eq!(meta.etag().as_deref(), Some("t-10-0"));

        let meta = meta.with_content_encoding("gzip");
        assert_eq!(meta.etag().as_deref(), Some("t-10-0.gzip"));
    }

    #[test]
    fn explicit_etag_wins() {
        let meta = EntityMeta::new()
            .with_last_modified(UNIX_EPOCH)
            .with_etag(EntityTag::weak("v1").unwrap());
        assert_eq!(meta.etag().as_deref(), Some("v1"));
        assert!(meta.etag_is_weak());
    }

    #[test]
    fn defaults_are_absent() {
        let meta = EntityMeta::new();
        assert!(meta.content_type().is_none());
        assert!(meta.content_length().is_none());
        assert!(meta.content_encoding().is_none());
        assert!(meta.expires().is_none());
        assert!(meta.etag().is_none());
        assert!(!meta.etag_is_weak());
    }
}
