//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (assign / propagate request ID)
//!     → origin.rs (static file or upstream response)
//!     → middleware/header_rules.rs (apply header rules)
//!     → Send to client (CDN)
//! ```

pub mod middleware;
pub mod origin;
pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
