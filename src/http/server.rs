//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with a single catch-all handler
//! - Wire up tracing middleware
//! - Turn each request into a sealed `HttpRequest` via the driver
//! - Answer with an entity describing what was received
//! - Serve until ctrl-c, then shut down gracefully

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{LimitsConfig, ServerConfig};
use crate::entity::headers::write_entity_headers;
use crate::entity::{BytesEntity, HttpEntity};
use crate::headers::HeaderMap;
use crate::http::driver::RequestDriver;
use crate::request::{ContinueState, HttpRequest};

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub driver: RequestDriver,
    pub limits: LimitsConfig,
}

/// Echo server built on the entity model.
pub struct EntityServer {
    router: Router,
    config: ServerConfig,
}

impl EntityServer {
    pub fn new(config: ServerConfig) -> Self {
        let state = AppState {
            driver: RequestDriver::from_config(&config.forwarding),
            limits: config.limits.clone(),
        };
        let router = Self::build_router(state);
        Self { router, config }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(entity_handler))
            .route("/", any(entity_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router. Requires `ConnectInfo<SocketAddr>`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            trust_depth = self.config.forwarding.trust_depth,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// What the server saw, after sealing.
#[derive(Debug, Serialize)]
struct Echo {
    client_ip: String,
    https: bool,
    method: String,
    path: String,
    version: &'static str,
    params: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoded_body_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body_error: Option<String>,
}

impl Echo {
    async fn capture(request: &HttpRequest, limits: &LimitsConfig) -> Self {
        let mut params = BTreeMap::new();
        if let Ok(form) = request.form_data() {
            for (name, value) in form.iter() {
                params
                    .entry(name.to_string())
                    .or_insert_with(|| value.to_string());
            }
        }

        let cookies = request
            .cookies()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut body = None;
        let mut encoded_body_len = None;
        let mut body_error = None;
        if let Some(entity) = request.entity() {
            // hyper writes the interim response on the first body poll
            if request.exchange().continue_state() == ContinueState::Expected {
                request.exchange().record_continue(true);
            }
            if entity.content_encoding().is_some() {
                match entity.body_bytes(limits.max_body_bytes).await {
                    Ok(bytes) => encoded_body_len = Some(bytes.len()),
                    Err(e) => body_error = Some(e.to_string()),
                }
            } else {
                match entity.body_string(limits.max_body_chars).await {
                    Ok(text) => body = Some(text),
                    Err(e) => body_error = Some(e.to_string()),
                }
            }
        }

        Self {
            client_ip: request.ip().to_string(),
            https: request.is_https(),
            method: request.method().to_string(),
            path: request.uri_path().to_string(),
            version: request.http_version(),
            params,
            cookies,
            body,
            encoded_body_len,
            body_error,
        }
    }
}

async fn entity_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let is_head = parts.method == Method::HEAD;

    let request = match state.driver.accept(&parts, body, peer, false) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "Rejecting malformed request");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let echo = Echo::capture(&request, &state.limits).await;

    request.exchange().mark_responded();
    if request.exchange().needs_drain() {
        tracing::debug!(
            body = ?request.exchange().body_state(),
            "Responding before the request body was consumed"
        );
    }

    let entity = match BytesEntity::json(&echo) {
        Ok(entity) => entity.with_last_modified(request.time_received()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize echo");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let entity = if is_head { entity.for_head() } else { entity };

    entity_response(&entity)
}

/// Convert an entity into an axum response with its metadata headers.
pub fn entity_response<E: HttpEntity + ?Sized>(entity: &E) -> Response {
    let mut headers = HeaderMap::new();
    if let Err(e) = write_entity_headers(entity, &mut headers) {
        tracing::error!(error = %e, "Failed to render entity headers");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let body = match entity.body() {
        Ok(body) => axum::body::Body::from_stream(body),
        Err(e) => {
            tracing::error!(error = %e, "Entity body unavailable");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut builder = axum::http::Response::builder().status(StatusCode::OK);
    for (name, value) in headers.iter() {
        builder = builder.header(name, value);
    }
    match builder.body(body) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
