//! Origin server library: path-based response header rules.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rules;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rules::{RequestPath, RuleSet};
