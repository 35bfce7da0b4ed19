//! Startup orchestration.
//!
//! # Responsibilities
//! - Compile the header rules from a validated configuration
//! - Start background tasks (metrics endpoint, config watcher)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;

use tokio::net::TcpListener;

use crate::config::watcher::ConfigWatcher;
use crate::config::ServerConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::rules::{self, RuleSet};

/// Run the origin server for `config`.
///
/// With `watch_path` set, rule changes in that file are picked up live.
pub async fn serve(config: ServerConfig, watch_path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let compiled = RuleSet::from_config(&config.rules);
    tracing::info!(rules = compiled.len(), "Header rules compiled");
    let rules = rules::shared(compiled);

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    // Dropping the watcher stops it, so it lives until serve returns.
    let _watcher = match watch_path {
        Some(path) => Some(ConfigWatcher::new(path, rules.clone()).run()?),
        None => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(&shutdown);

    let server = HttpServer::new(config, rules)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
