//! Axum middleware.

pub mod header_rules;

pub use header_rules::header_rules_middleware;
