//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! entity / request / driver code produces:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters via `metrics`)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields instead of formatted messages
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;
