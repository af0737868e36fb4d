//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all handler)
//!     → driver.rs (axum request → RequestState → sealed HttpRequest)
//!     → handler reads the request and its entity
//!     → server.rs (entity → response headers and body)
//!     → Send to client
//! ```

pub mod driver;
pub mod server;

pub use driver::RequestDriver;
pub use server::EntityServer;
