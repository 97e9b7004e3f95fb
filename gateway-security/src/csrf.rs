//! CSRF guard: safe methods and exempt headers pass
//! immediately; everything else is checked against the Origin/Referer
//! allowlist, same-origin match, or (allowlist-empty) localhost fallback.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::{header, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use gateway_core::{HttpFactory, HttpFilter, HttpHandler, Middleware};
use gateway_net::{OriginMatch, OriginMatcher};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CsrfConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Build the CSRF filter from an explicit allowlist.
pub fn csrf_filter(config: CsrfConfig) -> HttpFilter {
    let matcher = Arc::new(OriginMatcher::new(&config.allowed_origins));
    Arc::new(move |next: HttpHandler| {
        let matcher = matcher.clone();
        next.layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            let matcher = matcher.clone();
            async move { handle(matcher, req, next).await }
        }))
    })
}

async fn handle(matcher: Arc<OriginMatcher>, req: Request, next: Next) -> Response {
    if matches!(
        *req.method(),
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    ) {
        return next.run(req).await;
    }

    let headers = req.headers();
    if headers.contains_key("x-api-key")
        || headers.contains_key("x-requested-with")
        || headers.contains_key("x-mcp-any-csrf")
    {
        return next.run(req).await;
    }
    if headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "))
    {
        return next.run(req).await;
    }
    if headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
    {
        return next.run(req).await;
    }

    let origin = header_str(headers, header::ORIGIN.as_str());
    let referer = header_str(headers, header::REFERER.as_str());
    let host = header_str(headers, header::HOST.as_str()).unwrap_or_default();

    let allowed = match (origin, referer) {
        (None, None) => true,
        (Some(origin), _) => source_allowed(&matcher, &origin, &host),
        (None, Some(referer)) => source_allowed(&matcher, &referer, &host),
    };

    if allowed {
        next.run(req).await
    } else {
        (
            StatusCode::FORBIDDEN,
            "Forbidden: CSRF check failed",
        )
            .into_response()
    }
}

fn header_str(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Strip any path/query from an `Origin` or `Referer` value, leaving
/// `scheme://host[:port]`.
fn to_origin_string(value: &str) -> String {
    let scheme_end = value.find("://").map(|i| i + 3).unwrap_or(0);
    let after_scheme = &value[scheme_end..];
    let host_end = after_scheme.find('/').unwrap_or(after_scheme.len());
    value[..scheme_end + host_end].to_string()
}

fn host_only(value: &str) -> String {
    to_origin_string(value)
        .rsplit_once("://")
        .map(|(_, host)| host.to_string())
        .unwrap_or_default()
}

fn source_allowed(matcher: &OriginMatcher, source: &str, request_host: &str) -> bool {
    let candidate_origin = to_origin_string(source);
    let candidate_host = host_only(source);
    let on_allowlist = !matches!(matcher.matches(&candidate_origin), OriginMatch::None);
    let same_origin = OriginMatcher::is_same_origin(&candidate_host, request_host);
    let localhost_fallback = matcher.is_empty() && OriginMatcher::is_localhost(&candidate_host);
    on_allowlist || same_origin || localhost_fallback
}

/// Registry factory: parses `Middleware.settings` into [`CsrfConfig`].
pub fn factory() -> HttpFactory {
    Arc::new(|mw: &Middleware| {
        let value = serde_json::Value::Object(mw.settings.clone().into_iter().collect());
        let config: CsrfConfig = serde_json::from_value(value).unwrap_or_default();
        csrf_filter(config)
    })
}
