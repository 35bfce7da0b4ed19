//! Response sources the header rules decorate.
//!
//! # Responsibilities
//! - Serve files from a static directory
//! - Or forward requests to a single upstream server
//!
//! # Design Decisions
//! - Upstream responses are streamed, not buffered
//! - Upstream failures map to 502 Bad Gateway; the rules still run on it

use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, InvalidUri, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tower_http::services::ServeDir;

use crate::config::OriginConfig;
use crate::http::request::RequestIdExt;

/// Upstream forwarding state.
#[derive(Clone)]
pub struct Upstream {
    authority: Authority,
    client: Client<HttpConnector, Body>,
}

impl Upstream {
    pub fn new(address: &str, connect_timeout: Duration) -> Result<Self, InvalidUri> {
        let authority = Authority::from_str(address)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { authority, client })
    }
}

/// Build the router producing origin responses.
pub fn origin_router(origin: &OriginConfig, connect_timeout: Duration) -> Result<Router, InvalidUri> {
    let router = match origin {
        OriginConfig::Static { root } => {
            tracing::info!(root = %root, "Serving static files");
            Router::new().fallback_service(ServeDir::new(root))
        }
        OriginConfig::Upstream { address } => {
            tracing::info!(upstream = %address, "Forwarding to upstream");
            let upstream = Upstream::new(address, connect_timeout)?;
            Router::new().fallback(forward_handler).with_state(upstream)
        }
    };
    Ok(router)
}

/// Forward the request to the upstream and stream back its response.
async fn forward_handler(State(upstream): State<Upstream>, request: Request<Body>) -> Response {
    let request_id = request.request_id().unwrap_or("unknown").to_string();
    let (mut parts, body) = request.into_parts();

    // URI rewrite
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(upstream.authority.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Cannot build upstream URI");
            return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
        }
    };

    tracing::debug!(request_id = %request_id, uri = %parts.uri, "Forwarding request");

    match upstream.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
