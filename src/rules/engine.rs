//! Header rule evaluation.
//!
//! # Responsibilities
//! - Store compiled rules in configuration order
//! - Apply every matching rule's header changes to a response header map
//! - Report which rules matched
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Rules are not exclusive: all matching rules apply, in order
//! - Set replaces every existing value of the header, so later rules win
//! - No I/O and no failure path: a rule either applies or is skipped

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::{HeaderChangeConfig, RuleConfig};
use crate::rules::matcher::Matcher;
use crate::rules::path::RequestPath;

/// What to do with one header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderChange {
    /// Insert the value, replacing any existing values.
    Set(HeaderValue),
    /// Remove the header entirely.
    Remove,
}

/// A matcher together with the header changes it triggers.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub matcher: Matcher,
    pub changes: Vec<(HeaderName, HeaderChange)>,
}

impl Rule {
    pub fn new(name: impl Into<String>, matcher: Matcher) -> Self {
        Self {
            name: name.into(),
            matcher,
            changes: Vec::new(),
        }
    }

    /// Builder helper: set `name` to `value` when the rule matches.
    pub fn set(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.changes.push((name, HeaderChange::Set(value)));
        self
    }

    /// Builder helper: remove `name` when the rule matches.
    pub fn remove(mut self, name: HeaderName) -> Self {
        self.changes.push((name, HeaderChange::Remove));
        self
    }

    /// Compile a rule from config.
    ///
    /// Header names or values that are not valid HTTP are skipped with a
    /// warning; config validation rejects them before this point.
    pub fn from_config(index: usize, config: &RuleConfig) -> Self {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| format!("rule-{}", index));
        let matcher = Matcher::compile(&config.matcher, &name);

        let mut changes = Vec::new();
        for (header, change) in config.headers.iter() {
            let Ok(header_name) = HeaderName::from_bytes(header.as_bytes()) else {
                tracing::warn!(rule = %name, header = %header, "Skipping invalid header name");
                continue;
            };
            let change = match change {
                HeaderChangeConfig::Set(value) => match HeaderValue::from_str(value) {
                    Ok(value) => HeaderChange::Set(value),
                    Err(_) => {
                        tracing::warn!(rule = %name, header = %header, "Skipping invalid header value");
                        continue;
                    }
                },
                HeaderChangeConfig::Delete => HeaderChange::Remove,
            };
            changes.push((header_name, change));
        }

        Self { name, matcher, changes }
    }

    fn apply(&self, headers: &mut HeaderMap) {
        for (name, change) in &self.changes {
            match change {
                HeaderChange::Set(value) => {
                    headers.insert(name.clone(), value.clone());
                }
                HeaderChange::Remove => {
                    headers.remove(name);
                }
            }
        }
    }
}

/// An ordered, immutable list of header rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Compile the configured rules, preserving their order.
    pub fn from_config(configs: &[RuleConfig]) -> Self {
        let rules = configs
            .iter()
            .enumerate()
            .map(|(index, config)| Rule::from_config(index, config))
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule that matches `path` to `headers`, in order.
    ///
    /// Returns the names of the rules that matched.
    pub fn apply(&self, path: &RequestPath, headers: &mut HeaderMap) -> Vec<&str> {
        let mut matched = Vec::new();
        for rule in &self.rules {
            if rule.matcher.matches(path) {
                rule.apply(headers);
                matched.push(rule.name.as_str());
            }
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HeaderChanges, MatcherConfig};
    use crate::rules::matcher::Shortcut;
    use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, VARY};

    const ONE_YEAR: &str = "public, max-age=31536000";

    fn cdn_rules() -> RuleSet {
        RuleSet::new(vec![
            Rule::new("cache", Matcher::All)
                .set(CACHE_CONTROL, HeaderValue::from_static(ONE_YEAR)),
            Rule::new("fonts", Matcher::Shortcut(Shortcut::Fonts))
                .set(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"))
                .remove(VARY),
        ])
    }

    fn vary_origin() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(VARY, HeaderValue::from_static("Origin"));
        headers
    }

    #[test]
    fn test_font_request() {
        let rules = cdn_rules();
        let mut headers = vary_origin();

        let matched = rules.apply(&RequestPath::from_uri_path("/assets/webfont.woff"), &mut headers);

        assert_eq!(matched, vec!["cache", "fonts"]);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[CACHE_CONTROL], ONE_YEAR);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(!headers.contains_key(VARY));
    }

    #[test]
    fn test_non_font_request() {
        let rules = cdn_rules();
        let mut headers = vary_origin();

        let matched = rules.apply(&RequestPath::from_uri_path("/assets/app.js"), &mut headers);

        assert_eq!(matched, vec!["cache"]);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[CACHE_CONTROL], ONE_YEAR);
        assert_eq!(headers[VARY], "Origin");
    }

    #[test]
    fn test_later_rule_wins() {
        let rules = RuleSet::new(vec![
            Rule::new("first", Matcher::All).set(CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            Rule::new("second", Matcher::PathPrefix("/fonts".into()))
                .set(CACHE_CONTROL, HeaderValue::from_static(ONE_YEAR)),
        ]);

        let mut headers = HeaderMap::new();
        rules.apply(&RequestPath::from_uri_path("/fonts/a.eot"), &mut headers);
        assert_eq!(headers[CACHE_CONTROL], ONE_YEAR);

        let mut headers = HeaderMap::new();
        rules.apply(&RequestPath::from_uri_path("/index.html"), &mut headers);
        assert_eq!(headers[CACHE_CONTROL], "no-cache");
    }

    #[test]
    fn test_set_replaces_all_existing_values() {
        let rules = RuleSet::new(vec![
            Rule::new("vary", Matcher::All).set(VARY, HeaderValue::from_static("Accept-Encoding")),
        ]);
        let mut headers = HeaderMap::new();
        headers.append(VARY, HeaderValue::from_static("Origin"));
        headers.append(VARY, HeaderValue::from_static("Cookie"));

        rules.apply(&RequestPath::from_uri_path("/"), &mut headers);

        let values: Vec<_> = headers.get_all(VARY).iter().collect();
        assert_eq!(values, vec!["Accept-Encoding"]);
    }

    #[test]
    fn test_delete_after_set() {
        let rules = RuleSet::new(vec![
            Rule::new("set", Matcher::All).set(VARY, HeaderValue::from_static("Origin")),
            Rule::new("unset", Matcher::Extensions(vec!["ttf".into()])).remove(VARY),
        ]);
        let mut headers = HeaderMap::new();
        rules.apply(&RequestPath::from_uri_path("/f.ttf"), &mut headers);
        assert!(!headers.contains_key(VARY));
    }

    #[test]
    fn test_idempotent() {
        let rules = cdn_rules();
        for path in ["/assets/webfont.woff", "/assets/app.js", "fonts/a.eot"] {
            let path = RequestPath::from_uri_path(path);
            let mut once = vary_origin();
            rules.apply(&path, &mut once);

            let mut twice = vary_origin();
            rules.apply(&path, &mut twice);
            rules.apply(&path, &mut twice);

            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_prefix_scenario() {
        let rules = RuleSet::new(vec![
            Rule::new("fonts-dir", Matcher::PathPrefix("/fonts".into()))
                .set(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        ]);

        let mut with_slash = HeaderMap::new();
        let mut without_slash = HeaderMap::new();
        rules.apply(&RequestPath::from_uri_path("/fonts/a.eot"), &mut with_slash);
        rules.apply(&RequestPath::from_uri_path("fonts/a.eot"), &mut without_slash);

        assert_eq!(with_slash, without_slash);
        assert_eq!(with_slash[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[test]
    fn test_from_config() {
        let configs = vec![
            RuleConfig {
                name: None,
                matcher: MatcherConfig::All,
                headers: HeaderChanges::from_iter([
                    ("Cache-Control", HeaderChangeConfig::Set(ONE_YEAR.into())),
                    ("X-Empty", HeaderChangeConfig::Set(String::new())),
                ]),
            },
            RuleConfig {
                name: Some("broken".into()),
                matcher: MatcherConfig::Unknown,
                headers: HeaderChanges::from_iter([("Vary", HeaderChangeConfig::Delete)]),
            },
            RuleConfig {
                name: Some("fonts".into()),
                matcher: MatcherConfig::Shortcut { name: "fonts".into() },
                headers: HeaderChanges::from_iter([
                    ("Bad Name", HeaderChangeConfig::Set("x".into())),
                    ("Access-Control-Allow-Origin", HeaderChangeConfig::Set("*".into())),
                ]),
            },
        ];

        let rules = RuleSet::from_config(&configs);
        assert_eq!(rules.len(), 3);
        assert_eq!(rules.rules()[0].name, "rule-0");
        assert_eq!(rules.rules()[2].changes.len(), 1);

        let mut headers = vary_origin();
        let matched = rules.apply(&RequestPath::from_uri_path("/a.svg"), &mut headers);

        assert_eq!(matched, vec!["rule-0", "fonts"]);
        // The unknown matcher is a no-op, so Vary survives.
        assert_eq!(headers[VARY], "Origin");
        // Empty string sets an empty header rather than deleting.
        assert_eq!(headers["x-empty"], "");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
