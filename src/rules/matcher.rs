//! Path matching logic.
//!
//! # Responsibilities
//! - Decide whether a rule applies to a request path
//! - Compile matcher configuration into ready-to-run matchers
//!
//! # Design Decisions
//! - One enum variant per matcher kind, dispatched with an exhaustive match
//! - Path and extension matching are case-sensitive
//! - Anything that cannot be compiled becomes `Never` (fail open)

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::config::MatcherConfig;
use crate::rules::path::RequestPath;

/// Named groups of extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    /// Webfont formats: ttf, otf, eot, woff, svg.
    Fonts,
}

impl Shortcut {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Shortcut::Fonts => &["ttf", "otf", "eot", "woff", "svg"],
        }
    }
}

/// Returned when a shortcut name is not known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownShortcut(pub String);

impl fmt::Display for UnknownShortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown shortcut `{}`", self.0)
    }
}

impl std::error::Error for UnknownShortcut {}

impl FromStr for Shortcut {
    type Err = UnknownShortcut;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fonts" => Ok(Shortcut::Fonts),
            other => Err(UnknownShortcut(other.to_string())),
        }
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shortcut::Fonts => f.write_str("fonts"),
        }
    }
}

/// A compiled predicate over request paths.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Accepts every path.
    All,
    /// Accepts paths under a folder, with or without a leading slash.
    PathPrefix(String),
    /// Accepts paths ending in `.` followed by one of the extensions.
    Extensions(Vec<String>),
    /// Accepts paths the expression matches.
    Regex(Regex),
    /// A named extension group.
    Shortcut(Shortcut),
    /// Accepts nothing. Stands in for matchers that failed to compile.
    Never,
}

impl Matcher {
    /// Compile a matcher from config. Problems are logged and yield `Never`.
    pub fn compile(config: &MatcherConfig, rule: &str) -> Self {
        match config {
            MatcherConfig::All => Matcher::All,
            MatcherConfig::Prefix { prefix } => Matcher::PathPrefix(prefix.clone()),
            MatcherConfig::Extensions { extensions } => Matcher::Extensions(extensions.clone()),
            MatcherConfig::Regex { pattern } => match Regex::new(pattern) {
                Ok(regex) => Matcher::Regex(regex),
                Err(e) => {
                    tracing::warn!(rule, pattern = %pattern, error = %e, "Invalid regex, rule disabled");
                    Matcher::Never
                }
            },
            MatcherConfig::Shortcut { name } => match name.parse() {
                Ok(shortcut) => Matcher::Shortcut(shortcut),
                Err(e) => {
                    tracing::warn!(rule, error = %e, "Rule disabled");
                    Matcher::Never
                }
            },
            MatcherConfig::Unknown => {
                tracing::warn!(rule, "Unrecognized matcher kind, rule disabled");
                Matcher::Never
            }
        }
    }

    /// Returns true if this matcher accepts the path.
    pub fn matches(&self, path: &RequestPath) -> bool {
        let path = path.as_str();
        match self {
            Matcher::All => true,
            Matcher::PathPrefix(prefix) => prefix_matches(path, prefix),
            Matcher::Extensions(extensions) => has_extension(path, extensions.as_slice()),
            Matcher::Regex(regex) => regex.is_match(path),
            Matcher::Shortcut(shortcut) => has_extension(path, shortcut.extensions()),
            Matcher::Never => false,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::All => f.write_str("all"),
            Matcher::PathPrefix(prefix) => write!(f, "prefix {}", prefix),
            Matcher::Extensions(extensions) => write!(f, "extensions [{}]", extensions.join(", ")),
            Matcher::Regex(regex) => write!(f, "regex {}", regex.as_str()),
            Matcher::Shortcut(shortcut) => write!(f, "shortcut {}", shortcut),
            Matcher::Never => f.write_str("never"),
        }
    }
}

fn prefix_matches(path: &str, prefix: &str) -> bool {
    // "/fonts" and "fonts" are the same folder; so are "/fonts/a" and "fonts/a".
    let folder = prefix.strip_prefix('/').unwrap_or(prefix);
    let path = path.strip_prefix('/').unwrap_or(path);
    path.starts_with(folder)
}

fn has_extension<S: AsRef<str>>(path: &str, extensions: &[S]) -> bool {
    extensions.iter().any(|ext| {
        let ext = ext.as_ref();
        path.len() > ext.len()
            && path.ends_with(ext)
            && path.as_bytes()[path.len() - ext.len() - 1] == b'.'
    })
}
