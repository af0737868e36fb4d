//! Error types shared across the entity and request subsystems.
//!
//! # Design Decisions
//! - Local, deterministic failures (reuse, encoding, charset, frozen) are
//!   surfaced as explicit errors of the failing operation only
//! - Best-effort derivations (forwarded chain, query view) never produce
//!   these; they degrade to "unknown" instead

use thiserror::Error;

/// Errors raised by entity and body operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// The body of a non-sharable entity was requested more than once.
    #[error("body of a non-sharable entity can only be obtained once")]
    ReuseViolation,

    /// Text decoding attempted on an encoded body.
    #[error("entity has content encoding `{0}`; decode the body first")]
    Encoding(String),

    /// The declared charset is not recognized.
    #[error("unsupported charset `{0}`")]
    Charset(String),

    /// The body exceeded the caller's limit.
    #[error("body exceeds limit of {limit}")]
    BodyTooLarge { limit: usize },

    /// Read attempted on a closed body.
    #[error("body is closed")]
    Closed,

    /// Request body read attempted after the response has begun.
    #[error("response already started; request body can no longer be read")]
    Responded,

    /// Entity tag contains a quote character.
    #[error("invalid entity tag: {0:?}")]
    InvalidEtag(String),

    /// Content-Length header is not a non-negative integer.
    #[error("invalid content length: {0:?}")]
    InvalidContentLength(String),

    /// Failure reported by the underlying byte stream.
    #[error("stream error: {0}")]
    Stream(String),
}

/// Errors raised by the header container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// Mutation attempted after the container was frozen.
    #[error("headers are frozen")]
    Frozen,

    /// Header name is empty or contains illegal characters.
    #[error("invalid header name: {0:?}")]
    InvalidName(String),
}

/// Errors raised when parsing a request target into a form view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormDataError {
    /// Target is neither origin-form nor absolute-form.
    #[error("invalid request target: {0:?}")]
    InvalidTarget(String),

    /// Malformed percent escape at the given byte offset.
    #[error("malformed percent escape at offset {0}")]
    InvalidEscape(usize),

    /// Percent-decoded bytes are not valid UTF-8.
    #[error("percent-decoded bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Errors raised while turning a transport request into an [`HttpRequest`].
///
/// [`HttpRequest`]: crate::request::HttpRequest
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("invalid request header: {0}")]
    Header(#[from] HeaderError),

    #[error("invalid request entity: {0}")]
    Entity(#[from] EntityError),
}
