//! HTTP entity subsystem.
//!
//! # Data Flow
//! ```text
//! producer (app or driver)
//!     → BytesEntity / StreamEntity (metadata + body source)
//!     → HttpEntity trait (what consumers see)
//!     → body() → Body (chunks, close)
//!     → headers.rs (metadata ↔ header fields)
//! ```
//!
//! # Design Decisions
//! - Metadata is available without constructing a body
//! - Sharable entities hand out independent bodies over immutable bytes
//! - Single-use entities fail loudly on a second obtain instead of handing
//!   out a stream that is no longer at its start

pub mod body;
pub mod bytes_entity;
pub mod contract;
pub mod etag;
pub mod headers;
pub mod meta;
pub mod stream_entity;

pub use body::{Body, ByteStream};
pub use bytes_entity::BytesEntity;
pub use contract::HttpEntity;
pub use etag::{default_etag, EntityTag};
pub use meta::EntityMeta;
pub use stream_entity::StreamEntity;
