//! `Cookie` request header parsing.

use std::collections::HashMap;

/// Parse a `Cookie` header into a name → value map.
///
/// Never fails: malformed pairs are skipped, an absent header yields an
/// empty map. The first occurrence of a name wins.
pub fn parse_cookie_header(header: Option<&str>) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    let Some(header) = header else {
        return cookies;
    };
    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        cookies
            .entry(name.to_string())
            .or_insert_with(|| value.to_string());
    }
    cookies
}
