//! Ordered, case-insensitive header container with a one-way freeze.
//!
//! # Responsibilities
//! - Store one value per header name, preserving insertion order
//! - Compare names ignoring ASCII case
//! - Reject every mutation once frozen
//!
//! # Design Decisions
//! - Linear scan over a `Vec`: request header counts are small and ordering
//!   must be stable for logging and re-serialization
//! - Repeated headers are folded into one value (`, `, or `; ` for `Cookie`)

use axum::http::HeaderName;

use crate::error::HeaderError;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_ENCODING: &str = "Content-Encoding";
pub const LAST_MODIFIED: &str = "Last-Modified";
pub const EXPIRES: &str = "Expires";
pub const ETAG: &str = "ETag";
pub const COOKIE: &str = "Cookie";
pub const EXPECT: &str = "Expect";
pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";
pub const X_FORWARDED_PROTO: &str = "X-Forwarded-Proto";

/// Header container, mutable until [`HeaderMap::freeze`] is called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
    frozen: bool,
}

impl HeaderMap {
    /// Create an empty, mutable header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the named header, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    /// Returns true if the named header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set a header, replacing any existing value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, HeaderError> {
        self.check_mutable()?;
        let name = validate_name(name.into())?;
        let value = value.into();
        match self.position(&name) {
            Some(i) => Ok(Some(std::mem::replace(&mut self.entries[i].1, value))),
            None => {
                self.entries.push((name, value));
                Ok(None)
            }
        }
    }

    /// Add a header value, folding it into an existing value of the same name.
    pub fn append(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), HeaderError> {
        self.check_mutable()?;
        let name = validate_name(name.into())?;
        let value = value.into();
        match self.position(&name) {
            Some(i) => {
                let separator = if name.eq_ignore_ascii_case(COOKIE) { "; " } else { ", " };
                let existing = &mut self.entries[i].1;
                existing.push_str(separator);
                existing.push_str(&value);
            }
            None => self.entries.push((name, value)),
        }
        Ok(())
    }

    /// Remove a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Result<Option<String>, HeaderError> {
        self.check_mutable()?;
        Ok(self.position(name).map(|i| self.entries.remove(i).1))
    }

    /// Freeze the map. Irreversible.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns true once [`HeaderMap::freeze`] has been called.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Iterate headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    fn check_mutable(&self) -> Result<(), HeaderError> {
        if self.frozen {
            tracing::warn!("Attempted to mutate frozen headers");
            return Err(HeaderError::Frozen);
        }
        Ok(())
    }
}

/// Names must be RFC 9110 tokens; the original spelling is kept.
fn validate_name(name: String) -> Result<String, HeaderError> {
    match HeaderName::from_bytes(name.as_bytes()) {
        Ok(_) => Ok(name),
        Err(_) => Err(HeaderError::InvalidName(name)),
    }
}
