//! HTTP entity and request model.
//!
//! Entities (status-independent message bodies plus their metadata), a
//! sealed inbound request with lazily derived views, `X-Forwarded-*`
//! resolution, and the bookkeeping a protocol driver needs for request
//! bodies and `100 Continue`.

pub mod config;
pub mod entity;
pub mod error;
pub mod headers;
pub mod http;
pub mod lazy;
pub mod observability;
pub mod request;

pub use config::ServerConfig;
pub use entity::{Body, BytesEntity, EntityMeta, EntityTag, HttpEntity, StreamEntity};
pub use error::{DriverError, EntityError, FormDataError, HeaderError};
pub use headers::HeaderMap;
pub use http::{EntityServer, RequestDriver};
pub use lazy::LazyView;
pub use request::{HttpRequest, RequestState};
