//! Header rule subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing response (request path, response headers)
//!     → path.rs (percent-decode the request path)
//!     → engine.rs (walk rules in order)
//!     → matcher.rs (evaluate each rule's path predicate)
//!     → Set / Remove headers of every matching rule
//!
//! Rule Compilation (at startup and on reload):
//!     RuleConfig[]
//!     → Compile matchers (regexes, shortcuts)
//!     → Parse header names and values
//!     → Freeze as immutable RuleSet
//! ```
//!
//! # Design Decisions
//! - Rules compiled once, immutable at runtime
//! - Deterministic: same path and headers always give the same result
//! - All matching rules apply; the last one to touch a header wins
//! - Broken matchers fail open (never match) instead of failing requests

pub mod engine;
pub mod matcher;
pub mod path;

pub use engine::{HeaderChange, Rule, RuleSet};
pub use matcher::{Matcher, Shortcut};
pub use path::RequestPath;

use std::sync::Arc;

use arc_swap::ArcSwap;

/// The live rule set. Readers take a snapshot per response; reloads swap it.
pub type SharedRules = Arc<ArcSwap<RuleSet>>;

/// Wrap a freshly compiled rule set for sharing.
pub fn shared(rules: RuleSet) -> SharedRules {
    Arc::new(ArcSwap::from_pointee(rules))
}
