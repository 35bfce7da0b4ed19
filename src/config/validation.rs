//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, paths and value ranges
//! - Check that every configured header name and value is valid HTTP
//! - Report matcher problems as warnings; they fail open at runtime
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<Vec<String>, Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::{HeaderChangeConfig, MatcherConfig, OriginConfig, ServerConfig};
use crate::rules::matcher::Shortcut;

/// A semantic problem that makes the configuration unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} address `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("static root `{0}` is not a directory")]
    MissingStaticRoot(String),

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("rule `{rule}`: invalid header name `{name}`")]
    InvalidHeaderName { rule: String, name: String },

    #[error("rule `{rule}`: invalid value for header `{name}`")]
    InvalidHeaderValue { rule: String, name: String },
}

/// Validate a parsed configuration.
///
/// On success returns the non-fatal warnings (matchers that will never match).
pub fn validate_config(config: &ServerConfig) -> Result<Vec<String>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue { field: "timeouts.request_secs" });
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroValue { field: "timeouts.connect_secs" });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    match &config.origin {
        OriginConfig::Static { root } => {
            if !Path::new(root).is_dir() {
                errors.push(ValidationError::MissingStaticRoot(root.clone()));
            }
        }
        OriginConfig::Upstream { address } => {
            if address.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError::InvalidAddress {
                    field: "origin.address",
                    value: address.clone(),
                });
            }
        }
    }

    for (index, rule) in config.rules.iter().enumerate() {
        let rule_name = rule
            .name
            .clone()
            .unwrap_or_else(|| format!("rule-{}", index));

        if let Some(warning) = matcher_warning(&rule.matcher) {
            warnings.push(format!("rule `{}`: {}", rule_name, warning));
        }

        for (name, change) in rule.headers.iter() {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidHeaderName {
                    rule: rule_name.clone(),
                    name: name.clone(),
                });
                continue;
            }
            if let HeaderChangeConfig::Set(value) = change {
                if HeaderValue::from_str(value).is_err() {
                    errors.push(ValidationError::InvalidHeaderValue {
                        rule: rule_name.clone(),
                        name: name.clone(),
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(errors)
    }
}

fn matcher_warning(matcher: &MatcherConfig) -> Option<String> {
    match matcher {
        MatcherConfig::All => None,
        MatcherConfig::Prefix { prefix } if prefix.is_empty() => {
            Some("empty prefix matches every path".to_string())
        }
        MatcherConfig::Prefix { .. } => None,
        MatcherConfig::Extensions { extensions } if extensions.is_empty() => {
            Some("empty extension list never matches".to_string())
        }
        MatcherConfig::Extensions { .. } => None,
        MatcherConfig::Regex { pattern } => regex::Regex::new(pattern)
            .err()
            .map(|e| format!("regex never matches: {}", e)),
        MatcherConfig::Shortcut { name } => match name.parse::<Shortcut>() {
            Ok(_) => None,
            Err(_) => Some(format!("unknown shortcut `{}` never matches", name)),
        },
        MatcherConfig::Unknown => Some("unrecognized matcher kind never matches".to_string()),
    }
}
