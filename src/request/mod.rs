//! Inbound request model.
//!
//! # Data Flow
//! ```text
//! request line + headers (driver)
//!     → state.rs (RequestState: populate, attach body)
//!     → forwarded.rs (optional X-Forwarded-* trust)
//!     → state.rs (seal → HttpRequest, frozen)
//!     → handlers read fields, derived views, and the entity body
//!
//! Body reads:
//!     tracked.rs reports each read to exchange.rs
//!     → driver asks exchange.rs whether to drain before responding
//! ```
//!
//! # Design Decisions
//! - Population and reading are separate types; sealing is a move
//! - Derived views live on the sealed request and are computed lazily

pub mod cookie;
pub mod exchange;
pub mod form;
pub mod forwarded;
pub mod state;
pub mod tracked;

pub use exchange::{BodyEvent, BodyState, ContinueState, Exchange};
pub use form::FormData;
pub use forwarded::{ForwardedCandidate, Origin, Rejection};
pub use state::{HttpRequest, RequestState};
