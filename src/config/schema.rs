//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the origin
//! server. All types derive Serde traits for deserialization from config files.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Root configuration for the origin server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Where responses come from.
    pub origin: OriginConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Ordered header rules. Later rules win on conflicting header names.
    pub rules: Vec<RuleConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Source of the responses the rules decorate.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OriginConfig {
    /// Serve files from a local directory.
    Static { root: String },

    /// Forward every request to a single upstream server.
    Upstream { address: String },
}

impl Default for OriginConfig {
    fn default() -> Self {
        OriginConfig::Static {
            root: "./public".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,

    /// Human readable or JSON lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One header rule as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Identifier for logs and metrics. Defaults to `rule-<index>`.
    #[serde(default)]
    pub name: Option<String>,

    /// Which request paths this rule applies to.
    #[serde(rename = "match")]
    pub matcher: MatcherConfig,

    /// Header changes, applied in file order.
    #[serde(default)]
    pub headers: HeaderChanges,
}

/// Matcher selection. Unrecognized kinds deserialize to `Unknown` and never match.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MatcherConfig {
    All,
    Prefix { prefix: String },
    Extensions { extensions: Vec<String> },
    Regex { pattern: String },
    Shortcut { name: String },
    #[serde(other)]
    Unknown,
}

/// A single header change: set to a value, or delete.
///
/// Strings set the header. `false` (TOML, JSON) or `null` (JSON) delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderChangeConfig {
    Set(String),
    Delete,
}

impl Serialize for HeaderChangeConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HeaderChangeConfig::Set(value) => serializer.serialize_str(value),
            HeaderChangeConfig::Delete => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for HeaderChangeConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChangeVisitor;

        impl<'de> Visitor<'de> for ChangeVisitor {
            type Value = HeaderChangeConfig;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a header value string, or false/null to delete the header")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(HeaderChangeConfig::Set(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(HeaderChangeConfig::Set(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                if v {
                    Err(E::invalid_value(de::Unexpected::Bool(true), &self))
                } else {
                    Ok(HeaderChangeConfig::Delete)
                }
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(HeaderChangeConfig::Delete)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(HeaderChangeConfig::Delete)
            }
        }

        deserializer.deserialize_any(ChangeVisitor)
    }
}

/// Header changes of one rule, kept in the order they appear in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderChanges(pub Vec<(String, HeaderChangeConfig)>);

impl HeaderChanges {
    pub fn iter(&self) -> impl Iterator<Item = &(String, HeaderChangeConfig)> {
        self.0.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, HeaderChangeConfig)> for HeaderChanges {
    fn from_iter<I: IntoIterator<Item = (K, HeaderChangeConfig)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Serialize for HeaderChanges {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, change) in &self.0 {
            map.serialize_entry(name, change)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HeaderChanges {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChangesVisitor;

        impl<'de> Visitor<'de> for ChangesVisitor {
            type Value = HeaderChanges;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a table of header names to changes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut changes = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, change)) = access.next_entry::<String, HeaderChangeConfig>()? {
                    changes.push((name, change));
                }
                Ok(HeaderChanges(changes))
            }
        }

        deserializer.deserialize_map(ChangesVisitor)
    }
}
