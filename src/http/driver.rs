//! Adapter from axum requests to sealed [`HttpRequest`]s.
//!
//! # Responsibilities
//! - Copy method, target, version and headers into a `RequestState`
//! - Attach the inbound body as a single-use, tracked entity
//! - Resolve the forwarded chain and seal
//!
//! # Design Decisions
//! - A body entity exists when the request declares framing
//!   (`Content-Length` or `Transfer-Encoding`) or the transport body is not
//!   already at its end (HTTP/2 carries bodies without either header)
//! - Header values that are not valid UTF-8 are copied lossily

use std::net::SocketAddr;

use axum::body::HttpBody;
use axum::http::{request::Parts, Version};
use futures_util::TryStreamExt;

use crate::config::ForwardingConfig;
use crate::entity::headers::read_request_entity_meta;
use crate::entity::Body;
use crate::error::{DriverError, EntityError};
use crate::headers::{CONTENT_LENGTH, TRANSFER_ENCODING};
use crate::request::{HttpRequest, RequestState};

/// Builds sealed requests for one listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestDriver {
    trust_depth: u32,
}

impl RequestDriver {
    pub fn new(trust_depth: u32) -> Self {
        Self { trust_depth }
    }

    pub fn from_config(config: &ForwardingConfig) -> Self {
        Self::new(config.trust_depth)
    }

    pub fn trust_depth(&self) -> u32 {
        self.trust_depth
    }

    /// Populate and seal a request received from `peer`.
    pub fn accept(
        &self,
        parts: &Parts,
        body: axum::body::Body,
        peer: SocketAddr,
        is_https: bool,
    ) -> Result<HttpRequest, DriverError> {
        let mut state = RequestState::new(peer.ip(), is_https);
        state.set_method(parts.method.as_str());
        state.set_target(parts.uri.to_string());
        state.set_http_minor_version(minor_version(parts.version));

        for (name, value) in parts.headers.iter() {
            let value = String::from_utf8_lossy(value.as_bytes());
            state.headers_mut().append(name.as_str(), value)?;
        }

        let headers = state.headers();
        let framed = headers.contains(CONTENT_LENGTH) || headers.contains(TRANSFER_ENCODING);
        if framed || !body.is_end_stream() {
            let meta = read_request_entity_meta(headers)?;
            let stream = body
                .into_data_stream()
                .map_err(|e| EntityError::Stream(e.to_string()));
            state.set_stream_body(Body::from_stream(stream), meta);
        }

        state.resolve_forwarded(self.trust_depth);
        Ok(state.seal())
    }
}

fn minor_version(version: Version) -> Option<u8> {
    match version {
        Version::HTTP_10 => Some(0),
        Version::HTTP_11 => Some(1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{BodyState, ContinueState};
    use axum::http::Request;
    use std::net::IpAddr;

    fn split(request: Request<axum::body::Body>) -> (Parts, axum::body::Body) {
        request.into_parts()
    }

    fn peer() -> SocketAddr {
        "10.0.0.1:5000".parse().unwrap()
    }

    #[tokio::test]
    async fn copies_request_head() {
        let (parts, body) = split(
            Request::builder()
                .method("POST")
                .uri("/submit?a=1")
                .version(Version::HTTP_10)
                .header("Cookie", "x=1")
                .header("Cookie", "y=2")
                .header("Content-Length", "5")
                .header("Content-Type", "text/plain; charset=utf-8")
                .body(axum::body::Body::from("hello"))
                .unwrap(),
        );

        let request = RequestDriver::new(0).accept(&parts, body, peer(), false).unwrap();
        assert_eq!(request.method(), "POST");
        assert_eq!(request.uri(), "/submit?a=1");
        assert_eq!(request.http_version(), "HTTP/1.0");
        assert_eq!(request.cookie("y"), Some("2"));
        assert_eq!(request.uri_param("a"), Some("1"));
        assert!(request.is_sealed());
        assert_eq!(request.exchange().body_state(), BodyState::Unread);

        let entity = request.entity().unwrap();
        assert!(!entity.is_sharable());
        assert_eq!(entity.content_length(), Some(5));
        assert_eq!(entity.body_string(100).await.unwrap(), "hello");
        assert_eq!(request.exchange().body_state(), BodyState::Consumed);
        assert_eq!(entity.body().err(), Some(EntityError::ReuseViolation));
    }

    #[test]
    fn no_framing_means_no_entity() {
        let (parts, body) = split(Request::builder().uri("/").body(axum::body::Body::empty()).unwrap());
        let request = RequestDriver::default().accept(&parts, body, peer(), false).unwrap();
        assert!(request.entity().is_none());
        assert_eq!(request.exchange().body_state(), BodyState::NoBody);
        assert_eq!(request.exchange().continue_state(), ContinueState::NotExpected);
    }

    #[tokio::test]
    async fn unframed_http2_body_is_kept() {
        let (parts, body) = split(
            Request::builder()
                .method("POST")
                .uri("/")
                .version(Version::HTTP_2)
                .body(axum::body::Body::from("payload"))
                .unwrap(),
        );
        let request = RequestDriver::default().accept(&parts, body, peer(), false).unwrap();
        assert_eq!(request.http_minor_version(), None);
        assert_eq!(request.exchange().body_state(), BodyState::Unread);

        let entity = request.entity().unwrap();
        assert_eq!(entity.content_length(), None);
        assert_eq!(entity.body_string(100).await.unwrap(), "payload");
    }

    #[test]
    fn expect_header_sets_continue_state() {
        let (parts, body) = split(
            Request::builder()
                .method("PUT")
                .uri("/")
                .header("Expect", "100-continue")
                .header("Content-Length", "3")
                .body(axum::body::Body::from("abc"))
                .unwrap(),
        );
        let request = RequestDriver::default().accept(&parts, body, peer(), false).unwrap();
        assert_eq!(request.exchange().continue_state(), ContinueState::Expected);
    }

    #[test]
    fn trusted_chain_replaces_peer() {
        let (parts, body) = split(
            Request::builder()
                .uri("/")
                .header("X-Forwarded-For", "203.0.113.9, 10.0.0.2")
                .header("X-Forwarded-Proto", "https, http")
                .body(axum::body::Body::empty())
                .unwrap(),
        );
        let request = RequestDriver::new(2).accept(&parts, body, peer(), false).unwrap();
        assert_eq!(request.ip(), "203.0.113.9".parse::<IpAddr>().unwrap());
        assert!(request.is_https());
    }

    #[test]
    fn invalid_content_length_is_rejected() {
        let (parts, body) = split(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Content-Length", "ten")
                .body(axum::body::Body::empty())
                .unwrap(),
        );
        let err = RequestDriver::default().accept(&parts, body, peer(), false).unwrap_err();
        assert!(matches!(err, DriverError::Entity(EntityError::InvalidContentLength(_))));
    }
}
