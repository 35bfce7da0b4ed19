//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/JSON)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, matcher warnings)
//!     → ServerConfig (validated, immutable)
//!     → RuleSet compiled once, shared via Arc
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → new RuleSet compiled
//!     → atomic swap of Arc<RuleSet>
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{accept_config, load_config, parse_config, ConfigError};
pub use schema::{
    HeaderChangeConfig, HeaderChanges, ListenerConfig, LogFormat, MatcherConfig,
    ObservabilityConfig, OriginConfig, RuleConfig, ServerConfig,
};
