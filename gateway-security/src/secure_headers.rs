//! Security-headers filter: a path-prefix branch between a looser UI
//! policy and a strict API policy, rather than one static header set.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use gateway_core::{HttpFilter, HttpHandler};

const UI_CSP: &str =
    "default-src 'self'; script-src 'self' 'unsafe-eval' 'unsafe-inline' https://cdn.jsdelivr.net; style-src 'self' 'unsafe-inline'";
const API_CSP: &str = "default-src 'none'";
const API_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

pub fn secure_headers_filter() -> HttpFilter {
    Arc::new(|next: HttpHandler| next.layer(axum::middleware::from_fn(handle)))
}

/// Registry factory. Takes no config — the header policy is fixed.
pub fn factory() -> gateway_core::HttpFactory {
    Arc::new(|_mw: &gateway_core::Middleware| secure_headers_filter())
}

async fn handle(req: Request, next: Next) -> Response {
    let is_ui = req.uri().path().starts_with("/ui/");
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.remove(axum::http::header::SERVER);
    headers.insert("x-xss-protection", HeaderValue::from_static("0"));

    if is_ui {
        headers.insert("content-security-policy", HeaderValue::from_static(UI_CSP));
        headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    } else {
        headers.insert("content-security-policy", HeaderValue::from_static(API_CSP));
        headers.insert("x-frame-options", HeaderValue::from_static("SAMEORIGIN"));
        headers.insert(
            "cache-control",
            HeaderValue::from_static(API_CACHE_CONTROL),
        );
    }

    response
}
