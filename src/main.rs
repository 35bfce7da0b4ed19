//! Origin server that decorates responses with path-based header rules.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                    ORIGIN SERVER                     │
//!                 │                                                      │
//!   CDN Request   │  ┌─────────┐   ┌────────────┐   ┌────────────────┐   │
//!   ──────────────┼─▶│  http   │──▶│ request id │──▶│     origin     │   │
//!                 │  │ server  │   │  timeout   │   │ static | proxy │   │
//!                 │  └─────────┘   └────────────┘   └───────┬────────┘   │
//!                 │                                         │            │
//!                 │                                         ▼            │
//!   CDN Response  │                                ┌────────────────┐    │
//!   ◀─────────────┼────────────────────────────────│  header rules  │    │
//!                 │                                │  (rules::*)    │    │
//!                 │                                └────────────────┘    │
//!                 │                                                      │
//!                 │  config (TOML/JSON) ─▶ RuleSet ─▶ ArcSwap ◀─ watcher  │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use clap::{Parser, Subcommand};

use header_rules::config::{self, ObservabilityConfig, ServerConfig};
use header_rules::lifecycle::startup;
use header_rules::observability::logging::init_logging;
use header_rules::rules::{HeaderChange, RequestPath, RuleSet};

#[derive(Parser)]
#[command(name = "header-rules")]
#[command(about = "Serve assets with rule-based response headers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the origin server
    Serve {
        #[arg(short, long, default_value = "header-rules.toml")]
        config: PathBuf,

        /// Reload the rules when the config file changes
        #[arg(short, long)]
        watch: bool,
    },
    /// Validate a config file and list its rules
    Check {
        #[arg(short, long, default_value = "header-rules.toml")]
        config: PathBuf,
    },
    /// Show which rules match a path and the headers they produce
    Explain {
        #[arg(short, long, default_value = "header-rules.toml")]
        config: PathBuf,

        /// Request path, as sent on the wire (percent-encoded)
        path: String,

        /// Starting response header, as `Name: value`
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config: path, watch } => {
            let parsed = config::parse_config(&path)?;
            init_logging(&parsed.observability);
            tracing::info!("header-rules v{} starting", env!("CARGO_PKG_VERSION"));

            let server_config = config::accept_config(&path, parsed)?;
            tracing::info!(
                bind_address = %server_config.listener.bind_address,
                rules = server_config.rules.len(),
                "Configuration loaded"
            );

            startup::serve(server_config, watch.then_some(path.as_path())).await?;
        }
        Commands::Check { config: path } => {
            init_cli_logging();
            let server_config = config::load_config(&path)?;
            print!("{}", format_rules(&server_config));
        }
        Commands::Explain { config: path, path: request_path, headers } => {
            init_cli_logging();
            let server_config = config::load_config(&path)?;
            let header_map = parse_headers(&headers)?;

            let rules = RuleSet::from_config(&server_config.rules);
            print!("{}", format_explain(&rules, &request_path, header_map));
        }
    }

    Ok(())
}

fn init_cli_logging() {
    init_logging(&ObservabilityConfig {
        log_level: "warn".to_string(),
        ..Default::default()
    });
}

/// Output of `check`: the compiled rules and their header changes.
fn format_rules(config: &ServerConfig) -> String {
    let rules = RuleSet::from_config(&config.rules);
    let mut lines = vec![format!("config OK: {} rule(s)", rules.len())];
    for (index, rule) in rules.rules().iter().enumerate() {
        lines.push(format!("{:>3}. {} [{}]", index + 1, rule.name, rule.matcher));
        for (name, change) in &rule.changes {
            lines.push(match change {
                HeaderChange::Set(value) => {
                    format!("       set {}: {}", name, String::from_utf8_lossy(value.as_bytes()))
                }
                HeaderChange::Remove => format!("       remove {}", name),
            });
        }
    }
    lines.join("\n") + "\n"
}

/// Output of `explain`: matched rule names, then the final headers.
fn format_explain(rules: &RuleSet, request_path: &str, mut headers: HeaderMap) -> String {
    let matched = rules.apply(&RequestPath::from_uri_path(request_path), &mut headers);

    let mut lines = vec![if matched.is_empty() {
        "matched rules: (none)".to_string()
    } else {
        format!("matched rules: {}", matched.join(", "))
    }];
    for (name, value) in headers.iter() {
        lines.push(format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes())));
    }
    lines.join("\n") + "\n"
}

/// Parse `Name: value` arguments into a header map.
fn parse_headers(args: &[String]) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    for arg in args {
        let (name, value) = arg
            .split_once(':')
            .ok_or_else(|| format!("header `{}` must look like `Name: value`", arg))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| format!("header `{}`: {}", arg, e))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| format!("header `{}`: {}", arg, e))?;
        headers.append(name, value);
    }
    Ok(headers)
}
