//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router for the configured origin
//! - Wire up middleware (tracing, request ID, timeout, limits, header rules)
//! - Bind server to listener
//! - Stop accepting on shutdown and drain in-flight requests

use axum::{http::uri::InvalidUri, middleware, Router};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::http::middleware::header_rules_middleware;
use crate::http::origin::origin_router;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::rules::SharedRules;

/// Error building the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid upstream address: {0}")]
    InvalidUpstream(#[from] InvalidUri),
}

/// HTTP server for the origin.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and live rules.
    pub fn new(config: ServerConfig, rules: SharedRules) -> Result<Self, ServerError> {
        let router = Self::build_router(&config, rules)?;
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, rules: SharedRules) -> Result<Router, ServerError> {
        let router = origin_router(
            &config.origin,
            Duration::from_secs(config.timeouts.connect_secs),
        )?;

        // Outermost first. Header rules wrap every layer that writes response
        // headers or produces its own response (413, 408).
        Ok(router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(set_request_id_layer())
                .layer(middleware::from_fn_with_state(rules, header_rules_middleware))
                .layer(propagate_request_id_layer())
                .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
        ))
    }

    /// The router, for serving in-process (tests, custom listeners).
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            configured = %self.config.listener.bind_address,
            origin = ?self.config.origin,
            rules = self.config.rules.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HeaderChangeConfig, HeaderChanges, MatcherConfig, OriginConfig, RuleConfig};
    use crate::rules::{self, RuleSet};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn static_config(root: &std::path::Path) -> ServerConfig {
        let mut config = ServerConfig {
            origin: OriginConfig::Static { root: root.display().to_string() },
            ..Default::default()
        };
        config.rules = vec![
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
        ];
        config
    }

    fn router_for(config: ServerConfig) -> Router {
        let rules = rules::shared(RuleSet::from_config(&config.rules));
        HttpServer::new(config, rules).unwrap().into_router()
    }

    #[tokio::test]
    async fn test_static_font_is_decorated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("fonts")).unwrap();
        std::fs::write(dir.path().join("fonts/my font.woff"), b"wOFF").unwrap();

        let response = router_for(static_config(dir.path()))
            .oneshot(
                Request::builder()
                    .uri("/fonts/my%20font.woff")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=31536000");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(!headers.contains_key(header::VARY));
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_missing_file_is_still_decorated() {
        let dir = tempfile::tempdir().unwrap();

        let response = router_for(static_config(dir.path()))
            .oneshot(Request::builder().uri("/app.js").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=31536000");
        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_request_id_is_kept() {
        let dir = tempfile::tempdir().unwrap();

        let response = router_for(static_config(dir.path()))
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "cdn-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "cdn-42");
    }

    fn decorate_everything(config: &mut ServerConfig) {
        config.rules = vec![RuleConfig {
            name: Some("everything".into()),
            matcher: MatcherConfig::All,
            headers: HeaderChanges::from_iter([
                ("X-Decorated", HeaderChangeConfig::Set("yes".into())),
                ("x-request-id", HeaderChangeConfig::Delete),
            ]),
        }];
    }

    #[tokio::test]
    async fn test_rules_can_remove_request_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = static_config(dir.path());
        decorate_everything(&mut config);

        let response = router_for(config)
            .oneshot(
                Request::builder()
                    .uri("/missing.woff")
                    .header("x-request-id", "abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-decorated"], "yes");
        assert!(!response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_payload_too_large_is_decorated() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = static_config(dir.path());
        config.limits.max_body_size = 4;
        decorate_everything(&mut config);

        let response = router_for(config)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .header(header::CONTENT_LENGTH, "16")
                    .body(Body::from("0123456789abcdef"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()["x-decorated"], "yes");
    }

    #[tokio::test]
    async fn test_rules_swap_takes_effect() {
        let dir = tempfile::tempdir().unwrap();
        let config = static_config(dir.path());
        let rules = rules::shared(RuleSet::from_config(&config.rules));
        let router = HttpServer::new(config, rules.clone()).unwrap().into_router();

        rules.store(std::sync::Arc::new(RuleSet::default()));

        let response = router
            .oneshot(Request::builder().uri("/a.woff").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(!response.headers().contains_key(header::CACHE_CONTROL));
    }

    #[test]
    fn test_invalid_upstream() {
        let config = ServerConfig {
            origin: OriginConfig::Upstream { address: "not a host".into() },
            ..Default::default()
        };
        let result = HttpServer::new(config, rules::shared(RuleSet::default()));
        assert!(matches!(result, Err(ServerError::InvalidUpstream(_))));
    }
}
