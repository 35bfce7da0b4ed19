//! Header rules middleware.
//! Decorates every outgoing response with the headers of matching rules.

use std::panic::{self, AssertUnwindSafe};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::http::request::RequestIdExt;
use crate::observability::metrics;
use crate::rules::{RequestPath, SharedRules};

pub async fn header_rules_middleware(
    State(rules): State<SharedRules>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = RequestPath::from_uri_path(request.uri().path());
    let request_id = request.request_id().unwrap_or("unknown").to_string();

    let mut response = next.run(request).await;

    let rules = rules.load();
    let applied = contain(response.headers_mut(), |headers| {
        let matched = rules.apply(&path, headers);
        metrics::record_matches(&matched);
        tracing::debug!(
            request_id = %request_id,
            path = %path,
            matched = ?matched,
            "Header rules applied"
        );
    });

    if !applied {
        metrics::record_apply_failure();
        tracing::error!(
            request_id = %request_id,
            path = %path,
            "Header rules panicked, response sent unmodified"
        );
    }

    response
}

/// Run `f` against a copy of `headers`, keeping the copy only if `f` returns.
///
/// A panic inside `f` leaves `headers` exactly as they were. Returns whether
/// the changes were kept.
pub fn contain<F>(headers: &mut HeaderMap, f: F) -> bool
where
    F: FnOnce(&mut HeaderMap),
{
    let mut working = headers.clone();
    match panic::catch_unwind(AssertUnwindSafe(|| f(&mut working))) {
        Ok(()) => {
            *headers = working;
            true
        }
        Err(_) => false,
    }
}
