//! Panic recovery filter: catches a panic unwinding out of the
//! downstream handler, logs it with a redacted request URL, and answers with
//! a plain `500` that never echoes the panic value back to the caller.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use gateway_core::{HttpFactory, HttpFilter, HttpHandler, Middleware};
use regex::Regex;

fn sensitive_query_key() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("api_key|token|password|secret").expect("static pattern always compiles"))
}

pub fn recovery_filter() -> HttpFilter {
    Arc::new(|next: HttpHandler| next.layer(axum::middleware::from_fn(handle)))
}

/// Registry factory. Takes no config — panic handling is unconditional.
pub fn factory() -> HttpFactory {
    Arc::new(|_mw: &Middleware| recovery_filter())
}

async fn handle(req: Request, next: Next) -> Response {
    let redacted_url = redact_url(req.uri());
    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let message = panic_message(&panic);
            tracing::error!(url = %redacted_url, panic = %message, "panic recovered in downstream handler");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

fn redact_url(uri: &axum::http::Uri) -> String {
    let path = uri.path();
    match uri.query() {
        Some(query) => format!("{path}?{}", redact_query(query)),
        None => path.to_string(),
    }
}

fn redact_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _value)) if is_sensitive_key(key) => format!("{key}=[REDACTED]"),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    sensitive_query_key().is_match(&lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::routing::get;
    use axum::Router;
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    fn app() -> Router {
        recovery_filter()(
            Router::new()
                .route("/ok", get(|| async { "fine" }))
                .route(
                    "/boom",
                    get(|| async {
                        panic!("cannot reach the credential store");
                        #[allow(unreachable_code)]
                        "unreachable"
                    }),
                ),
        )
    }

    #[tokio::test]
    async fn passes_through_when_nothing_panics() {
        let req = HttpRequest::builder().uri("/ok").body(Body::empty()).unwrap();
        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn panics_become_a_plain_500_without_the_panic_message() {
        let req = HttpRequest::builder().uri("/boom").body(Body::empty()).unwrap();
        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8_lossy(&bytes);
        assert!(!body.contains("credential store"));
    }

    #[test]
    fn redacts_sensitive_query_parameters() {
        let uri: axum::http::Uri = "/tool/call?api_key=s3cr3t&name=widget".parse().unwrap();
        assert_eq!(redact_url(&uri), "/tool/call?api_key=[REDACTED]&name=widget");
    }

    #[test]
    fn leaves_urls_without_sensitive_keys_unchanged() {
        let uri: axum::http::Uri = "/tool/call?name=widget".parse().unwrap();
        assert_eq!(redact_url(&uri), "/tool/call?name=widget");
    }

    #[test]
    fn redacts_keys_that_only_contain_a_sensitive_term() {
        let uri: axum::http::Uri = "/tool/call?access_token=abc&client_secret=xyz&auth=fine".parse().unwrap();
        assert_eq!(
            redact_url(&uri),
            "/tool/call?access_token=[REDACTED]&client_secret=[REDACTED]&auth=fine"
        );
    }
}
