//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use header_rules::config::{HeaderChangeConfig, HeaderChanges, MatcherConfig, RuleConfig, ServerConfig};
use header_rules::rules::{self, RuleSet, SharedRules};
use header_rules::{HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a mock upstream that answers every request with `extra_headers` and `body`.
///
/// Returns the address it listens on.
#[allow(dead_code)]
pub async fn start_mock_backend(extra_headers: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                            extra_headers,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// The two-rule CDN setup: cache everything, open fonts to all origins.
pub fn cdn_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            name: Some("cache".into()),
            matcher: MatcherConfig::All,
            headers: HeaderChanges::from_iter([(
                "Cache-Control",
                HeaderChangeConfig::Set("public, max-age=31536000".into()),
            )]),
        },
        RuleConfig {
            name: Some("fonts".into()),
            matcher: MatcherConfig::Shortcut { name: "fonts".into() },
            headers: HeaderChanges::from_iter([
                ("Access-Control-Allow-Origin", HeaderChangeConfig::Set("*".into())),
                ("Vary", HeaderChangeConfig::Delete),
            ]),
        },
    ]
}

/// A running server and the handles to control it.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub rules: SharedRules,
    pub shutdown: Shutdown,
}

/// Start the origin server on an ephemeral port.
pub async fn start_server(mut config: ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let rules = rules::shared(RuleSet::from_config(&config.rules));
    let server = HttpServer::new(config, rules.clone()).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer { addr, rules, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
