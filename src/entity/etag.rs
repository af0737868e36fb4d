//! Entity tags.
//!
//! Tag values are stored unquoted. On the wire they are wrapped in `"` and
//! prefixed with `W/` when weak. A value may not contain `"`; backslash is
//! legal but best avoided since some peers treat it as an escape.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::EntityError;

/// Derive a tag from the modification time and content encoding.
///
/// Absent when `last_modified` is absent. Otherwise `t-{secs}-{nanos}` in
/// lowercase hex (seconds in two's complement when before the epoch),
/// suffixed with `.{encoding}` when one is present.
pub fn default_etag(last_modified: Option<SystemTime>, encoding: Option<&str>) -> Option<String> {
    let (secs, nanos) = epoch_parts(last_modified?);
    let mut tag = format!("t-{:x}-{:x}", secs, nanos);
    if let Some(encoding) = encoding {
        tag.push('.');
        tag.push_str(encoding);
    }
    Some(tag)
}

/// Seconds (floored) and non-negative nanoseconds relative to the epoch.
fn epoch_parts(time: SystemTime) -> (i64, u32) {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => (after.as_secs() as i64, after.subsec_nanos()),
        Err(e) => {
            let before = e.duration();
            let secs = -(before.as_secs() as i64);
            match before.subsec_nanos() {
                0 => (secs, 0),
                n => (secs - 1, 1_000_000_000 - n),
            }
        }
    }
}

/// A validated entity tag with its weak flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityTag {
    value: String,
    weak: bool,
}

impl EntityTag {
    pub fn new(value: impl Into<String>, weak: bool) -> Result<Self, EntityError> {
        let value = value.into();
        if value.contains('"') {
            return Err(EntityError::InvalidEtag(value));
        }
        Ok(Self { value, weak })
    }

    pub fn strong(value: impl Into<String>) -> Result<Self, EntityError> {
        Self::new(value, false)
    }

    pub fn weak(value: impl Into<String>) -> Result<Self, EntityError> {
        Self::new(value, true)
    }

    /// The unquoted value.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    /// Parse the wire form (`"v"` or `W/"v"`).
    pub fn parse(wire: &str) -> Option<Self> {
        let wire = wire.trim();
        let (weak, quoted) = match wire.strip_prefix("W/") {
            Some(rest) => (true, rest),
            None => (false, wire),
        };
        let value = quoted.strip_prefix('"')?.strip_suffix('"')?;
        Self::new(value, weak).ok()
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_wire(f, &self.value, self.weak)
    }
}

/// Render a tag value in wire form.
pub fn to_wire(value: &str, weak: bool) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    // Writing into a String cannot fail.
    let _ = write_wire(&mut out, value, weak);
    out
}

fn write_wire(out: &mut impl fmt::Write, value: &str, weak: bool) -> fmt::Result {
    if weak {
        out.write_str("W/")?;
    }
    out.write_char('"')?;
    out.write_str(value)?;
    out.write_char('"')
}
