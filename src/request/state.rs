//! Request population and sealing.
//!
//! # Responsibilities
//! - Collect request fields while the driver parses (`RequestState`)
//! - Apply forwarded-chain trust once configuration is known
//! - Seal into an immutable, shareable `HttpRequest`
//!
//! # Design Decisions
//! - Sealing consumes the builder, so no mutable access survives it; the
//!   headers are frozen as well so even a cloned map rejects mutation
//! - Derived views (query, cookies) are computed on first access and
//!   published once; the request can be read from many tasks without locks

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::SystemTime;

use crate::entity::{Body, EntityMeta, HttpEntity, StreamEntity};
use crate::error::FormDataError;
use crate::headers::{HeaderMap, COOKIE, EXPECT, X_FORWARDED_FOR, X_FORWARDED_PROTO};
use crate::lazy::LazyView;
use crate::observability::metrics;
use crate::request::cookie::parse_cookie_header;
use crate::request::exchange::{BodyState, ContinueState, Exchange};
use crate::request::form::{split_query, FormData};
use crate::request::forwarded::{self, Origin};
use crate::request::tracked::track_body;

/// A request under construction by the protocol driver.
///
/// Populated on a single task, then turned into an [`HttpRequest`] by
/// [`RequestState::seal`].
#[derive(Debug)]
pub struct RequestState {
    ip: IpAddr,
    is_https: bool,
    method: String,
    target: String,
    http_minor_version: Option<u8>,
    time_received: SystemTime,
    headers: HeaderMap,
    entity: Option<Arc<dyn HttpEntity>>,
    exchange: Arc<Exchange>,
}

impl RequestState {
    /// Start a request observed from `peer_ip` on a connection that is
    /// (or is not) TLS.
    pub fn new(peer_ip: IpAddr, is_https: bool) -> Self {
        Self {
            ip: peer_ip,
            is_https,
            method: String::new(),
            target: String::new(),
            http_minor_version: None,
            time_received: SystemTime::now(),
            headers: HeaderMap::new(),
            entity: None,
            exchange: Arc::new(Exchange::default()),
        }
    }

    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = method.into();
    }

    /// Raw request target as it appeared on the request line.
    pub fn set_target(&mut self, target: impl Into<String>) {
        self.target = target.into();
    }

    /// `Some(0)` or `Some(1)`; `None` when the version could not be parsed.
    pub fn set_http_minor_version(&mut self, minor: Option<u8>) {
        self.http_minor_version = minor;
    }

    pub fn set_time_received(&mut self, time: SystemTime) {
        self.time_received = time;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Attach an arbitrary entity.
    pub fn set_entity(&mut self, entity: Arc<dyn HttpEntity>) {
        self.entity = Some(entity);
    }

    /// Attach the inbound body as a single-use entity whose reads are
    /// tracked by this request's exchange.
    pub fn set_stream_body(&mut self, body: Body, meta: EntityMeta) {
        let body = track_body(body, Arc::clone(&self.exchange));
        self.entity = Some(Arc::new(StreamEntity::new(body, meta)));
    }

    pub fn origin(&self) -> Origin {
        Origin {
            ip: self.ip,
            is_https: self.is_https,
        }
    }

    /// Replace the client address and scheme from `X-Forwarded-*` headers,
    /// trusting `trust_depth` proxy hops. Leaves both untouched on any
    /// anomaly.
    pub fn resolve_forwarded(&mut self, trust_depth: u32) {
        let resolved = forwarded::resolve(
            self.origin(),
            trust_depth,
            self.headers.get(X_FORWARDED_FOR),
            self.headers.get(X_FORWARDED_PROTO),
        );
        self.ip = resolved.ip;
        self.is_https = resolved.is_https;
    }

    /// Freeze the headers and hand out the read-only request.
    pub fn seal(mut self) -> HttpRequest {
        self.headers.freeze();

        let continue_state = ContinueState::initial(self.headers.get(EXPECT));
        let content_length = self.entity.as_ref().and_then(|e| e.content_length());
        let body_state = BodyState::initial(self.entity.is_some(), content_length);
        self.exchange.start(continue_state, body_state);

        metrics::record_request_sealed(&self.method);
        tracing::debug!(
            method = %self.method,
            target = %self.target,
            client = %self.ip,
            https = self.is_https,
            body = ?body_state,
            "Request sealed"
        );

        HttpRequest {
            ip: self.ip,
            is_https: self.is_https,
            method: self.method,
            target: self.target,
            http_minor_version: self.http_minor_version,
            time_received: self.time_received,
            headers: self.headers,
            entity: self.entity,
            exchange: self.exchange,
            form: LazyView::new(),
            cookies: LazyView::new(),
        }
    }
}

/// A sealed inbound request. Read-only; safe to share across tasks.
#[derive(Debug)]
pub struct HttpRequest {
    ip: IpAddr,
    is_https: bool,
    method: String,
    target: String,
    http_minor_version: Option<u8>,
    time_received: SystemTime,
    headers: HeaderMap,
    entity: Option<Arc<dyn HttpEntity>>,
    exchange: Arc<Exchange>,
    form: LazyView<Result<FormData, FormDataError>>,
    cookies: LazyView<HashMap<String, String>>,
}

impl HttpRequest {
    /// Client address, after forwarded-chain resolution.
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn is_https(&self) -> bool {
        self.is_https
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Raw request target.
    pub fn uri(&self) -> &str {
        &self.target
    }

    pub fn http_minor_version(&self) -> Option<u8> {
        self.http_minor_version
    }

    pub fn http_version(&self) -> &'static str {
        match self.http_minor_version {
            Some(0) => "HTTP/1.0",
            _ => "HTTP/1.1",
        }
    }

    pub fn time_received(&self) -> SystemTime {
        self.time_received
    }

    /// Frozen headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_sealed(&self) -> bool {
        self.headers.is_frozen()
    }

    pub fn entity(&self) -> Option<&Arc<dyn HttpEntity>> {
        self.entity.as_ref()
    }

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// Parsed query view, or the reason the target could not be parsed.
    pub fn form_data(&self) -> Result<&FormData, &FormDataError> {
        self.form
            .get_or_derive(|| FormData::parse(&self.target))
            .as_ref()
    }

    /// Path of the target. Falls back to the raw target up to `?` when the
    /// target cannot be parsed.
    pub fn uri_path(&self) -> &str {
        match self.form_data() {
            Ok(form) => form.action(),
            Err(_) => split_query(&self.target).0,
        }
    }

    /// First value of a query parameter; `None` when absent or when the
    /// target cannot be parsed.
    pub fn uri_param(&self, name: &str) -> Option<&str> {
        self.form_data().ok()?.param(name)
    }

    /// Cookies from the `Cookie` header.
    pub fn cookies(&self) -> &HashMap<String, String> {
        self.cookies
            .get_or_derive(|| parse_cookie_header(self.headers.get(COOKIE)))
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HeaderError;
    use std::net::Ipv4Addr;

    fn state() -> RequestState {
        let mut state = RequestState::new(IpAddr::V4(Ipv4Addr::LOCALHOST), false);
        state.set_method("GET");
        state.set_target("/items?id=7");
        state.set_http_minor_version(Some(1));
        state
    }

    #[test]
    fn seal_freezes_headers() {
        let mut state = state();
        state.headers_mut().insert("Host", "example.com").unwrap();
        let request = state.seal();
        assert!(request.is_sealed());
        assert_eq!(request.headers().get("host"), Some("example.com"));

        let mut copy = request.headers().clone();
        assert_eq!(copy.insert("Host", "evil"), Err(HeaderError::Frozen));
    }

    #[test]
    fn derived_views() {
        let mut state = state();
        state.headers_mut().insert(COOKIE, "a=1; b=2").unwrap();
        let request = state.seal();
        assert_eq!(request.uri_path(), "/items");
        assert_eq!(request.uri_param("id"), Some("7"));
        assert_eq!(request.cookie("b"), Some("2"));
        assert!(std::ptr::eq(request.cookies(), request.cookies()));
    }

    #[test]
    fn malformed_target_degrades() {
        let mut state = state();
        state.set_target("/bad%zz?x=1");
        let request = state.seal();
        assert_eq!(request.uri_path(), "/bad%zz");
        assert_eq!(request.uri_param("x"), None);
        assert_eq!(request.form_data(), Err(&FormDataError::InvalidEscape(4)));
    }

    #[test]
    fn http_version_string() {
        let mut http10 = state();
        http10.set_http_minor_version(Some(0));
        assert_eq!(http10.seal().http_version(), "HTTP/1.0");

        let mut unknown = state();
        unknown.set_http_minor_version(None);
        assert_eq!(unknown.seal().http_version(), "HTTP/1.1");
    }

    #[test]
    fn forwarded_resolution_updates_origin() {
        let mut state = state();
        state
            .headers_mut()
            .insert(X_FORWARDED_FOR, "9.9.9.9, 1.1.1.1")
            .unwrap();
        state.headers_mut().insert(X_FORWARDED_PROTO, "https").unwrap();
        state.resolve_forwarded(1);
        let request = state.seal();
        assert_eq!(request.ip(), "1.1.1.1".parse::<IpAddr>().unwrap());
        assert!(request.is_https());
    }

    #[test]
    fn body_and_continue_states_initialised_at_seal() {
        let request = state().seal();
        assert_eq!(request.exchange().body_state(), BodyState::NoBody);
        assert_eq!(request.exchange().continue_state(), ContinueState::NotExpected);

        let mut expecting = state();
        expecting.headers_mut().insert(EXPECT, "100-continue").unwrap();
        expecting.set_stream_body(Body::empty(), EntityMeta::new().with_content_length(Some(0)));
        let request = expecting.seal();
        assert_eq!(request.exchange().body_state(), BodyState::Consumed);
        assert_eq!(request.exchange().continue_state(), ContinueState::Expected);
    }
}
