//! Shared utilities for integration tests.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::body::{Body, Bytes};
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use http_entity::config::ServerConfig;
use http_entity::http::EntityServer;
use http_entity::RequestState;

/// Address every test request appears to come from.
pub const PEER: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 40000);

/// Router for `config`, with the peer address injected.
#[allow(dead_code)]
pub fn app(config: ServerConfig) -> Router {
    EntityServer::new(config)
        .router()
        .layer(MockConnectInfo(PEER))
}

/// Drive one request through `app` and collect the whole response.
#[allow(dead_code)]
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body)
}

/// A request from [`PEER`] with method and target set.
#[allow(dead_code)]
pub fn request_state(method: &str, target: &str) -> RequestState {
    let mut state = RequestState::new(PEER.ip(), false);
    state.set_method(method);
    state.set_target(target);
    state.set_http_minor_version(Some(1));
    state
}
