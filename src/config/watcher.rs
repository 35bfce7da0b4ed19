//! Configuration file watcher for hot reload of header rules.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::loader::{load_config, ConfigError};
use crate::rules::{RuleSet, SharedRules};

/// Reload the rules from `path` and publish them.
///
/// On error the current rules stay in place. Returns the new rule count.
pub fn reload_rules(path: &Path, rules: &SharedRules) -> Result<usize, ConfigError> {
    let config = load_config(path)?;
    let compiled = RuleSet::from_config(&config.rules);
    let count = compiled.len();
    rules.store(Arc::new(compiled));
    Ok(count)
}

/// A watcher that monitors the configuration file for changes.
///
/// Only the rules are reloaded; listener and origin changes need a restart.
pub struct ConfigWatcher {
    path: PathBuf,
    rules: SharedRules,
}

impl ConfigWatcher {
    pub fn new(path: &Path, rules: SharedRules) -> Self {
        Self {
            path: path.to_path_buf(),
            rules,
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let rules = self.rules;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading rules...");
                        match reload_rules(&path, &rules) {
                            Ok(count) => tracing::info!(rules = count, "Header rules reloaded"),
                            Err(e) => tracing::error!(
                                "Failed to reload config: {}. Keeping current rules.",
                                e
                            ),
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
