//! Query view of a request target.
//!
//! # Responsibilities
//! - Split a request target into its path ("action") and query parameters
//! - Reject malformed targets instead of guessing
//!
//! # Design Decisions
//! - Accepts origin-form (`/path?q`) and absolute-form (`http://h/path?q`)
//! - The action is the raw path, not percent-decoded
//! - Parameter names and values are decoded with `url::form_urlencoded`
//!   after checking every escape is well formed and decodes to UTF-8

use url::{form_urlencoded, Url};

use crate::error::FormDataError;

/// Path and query parameters parsed from a request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormData {
    action: String,
    params: Vec<(String, String)>,
}

impl FormData {
    pub fn parse(target: &str) -> Result<Self, FormDataError> {
        if target.starts_with('/') {
            let (path, query) = split_query(target);
            return Self::from_parts(path, query);
        }

        let url = Url::parse(target).map_err(|_| FormDataError::InvalidTarget(target.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(FormDataError::InvalidTarget(target.to_string()));
        }
        Self::from_parts(url.path(), url.query())
    }

    fn from_parts(path: &str, query: Option<&str>) -> Result<Self, FormDataError> {
        if path.bytes().any(|b| b.is_ascii_control() || b == b' ') {
            return Err(FormDataError::InvalidTarget(path.to_string()));
        }
        check_escapes(path, 0)?;
        let params = match query {
            Some(query) => {
                check_escapes(query, path.len() + 1)?;
                form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            }
            None => Vec::new(),
        };
        Ok(Self {
            action: path.to_string(),
            params,
        })
    }

    /// The target's path.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// First value of the named parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of the named parameter, in order.
    pub fn params(&self, name: &str) -> impl Iterator<Item = &str> {
        let name = name.to_string();
        self.params
            .iter()
            .filter(move |(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// All parameters in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Path and optional query of an origin-form target.
pub fn split_query(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

/// Verify percent escapes are complete and the decoded bytes are UTF-8.
fn check_escapes(s: &str, base: usize) -> Result<(), FormDataError> {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = bytes.get(i + 1).and_then(|b| hex_value(*b));
                let lo = bytes.get(i + 2).and_then(|b| hex_value(*b));
                match (hi, lo) {
                    (Some(hi), Some(lo)) => decoded.push(hi << 4 | lo),
                    _ => return Err(FormDataError::InvalidEscape(base + i)),
                }
                i += 3;
            }
            b => {
                decoded.push(b);
                i += 1;
            }
        }
    }
    std::str::from_utf8(&decoded)
        .map(|_| ())
        .map_err(|_| FormDataError::InvalidUtf8)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_form() {
        let form = FormData::parse("/search?q=rust+lang&page=2&q=more").unwrap();
        assert_eq!(form.action(), "/search");
        assert_eq!(form.param("q"), Some("rust lang"));
        assert_eq!(form.param("page"), Some("2"));
        assert_eq!(form.params("q").collect::<Vec<_>>(), vec!["rust lang", "more"]);
        assert_eq!(form.param("missing"), None);
    }

    #[test]
    fn absolute_form() {
        let form = FormData::parse("http://example.com/a/b?x=%E2%9C%93").unwrap();
        assert_eq!(form.action(), "/a/b");
        assert_eq!(form.param("x"), Some("✓"));
    }

    #[test]
    fn path_is_not_decoded() {
        let form = FormData::parse("/a%20b").unwrap();
        assert_eq!(form.action(), "/a%20b");
        assert_eq!(form.iter().count(), 0);
    }

    #[test]
    fn malformed_escapes_fail() {
        assert_eq!(FormData::parse("/a?x=%zz"), Err(FormDataError::InvalidEscape(5)));
        assert_eq!(FormData::parse("/a%2"), Err(FormDataError::InvalidEscape(2)));
        assert_eq!(FormData::parse("/a?x=%FF"), Err(FormDataError::InvalidUtf8));
    }

    #[test]
    fn invalid_targets_fail() {
        assert!(matches!(FormData::parse("*"), Err(FormDataError::InvalidTarget(_))));
        assert!(matches!(FormData::parse(""), Err(FormDataError::InvalidTarget(_))));
        assert!(matches!(
            FormData::parse("mailto:someone@example.com"),
            Err(FormDataError::InvalidTarget(_))
        ));
        assert!(matches!(FormData::parse("/a b"), Err(FormDataError::InvalidTarget(_))));
    }

    #[test]
    fn split_query_keeps_empty_query() {
        assert_eq!(split_query("/p?"), ("/p", Some("")));
        assert_eq!(split_query("/p"), ("/p", None));
    }
}
