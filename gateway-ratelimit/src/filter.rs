//! The rate-limit HTTP filter: applies the token bucket per client key and
//! emits `429` on denial.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use gateway_core::{HttpFactory, HttpFilter, HttpHandler, Middleware};
use serde::Deserialize;

use crate::limiter::RateLimiter;

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rps")]
    pub rps: f64,
    #[serde(default = "default_burst")]
    pub burst: f64,
    #[serde(default)]
    pub trust_proxy: bool,
}

fn default_rps() -> f64 {
    10.0
}

fn default_burst() -> f64 {
    10.0
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rps: default_rps(),
            burst: default_burst(),
            trust_proxy: false,
        }
    }
}

/// Build the rate-limit filter from an explicit config.
pub fn rate_limit_filter(config: RateLimitConfig) -> HttpFilter {
    let limiter = RateLimiter::new(config.rps, config.burst);
    let trust_proxy = config.trust_proxy;
    Arc::new(move |next: HttpHandler| {
        let limiter = limiter.clone();
        next.layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            let limiter = limiter.clone();
            async move { handle(limiter, trust_proxy, req, next).await }
        }))
    })
}

async fn handle(limiter: RateLimiter, trust_proxy: bool, req: Request, next: Next) -> Response {
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.to_string())
        .unwrap_or_default();
    let forwarded_for = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let key = gateway_net::client_key(&remote_addr, forwarded_for, trust_proxy);

    if limiter.allow(&key) {
        next.run(req).await
    } else {
        tracing::debug!(client_key = %key, "rate limit exceeded");
        (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response()
    }
}

/// Registry factory: parses `Middleware.settings` into [`RateLimitConfig`],
/// falling back to defaults on missing/invalid fields.
pub fn factory() -> HttpFactory {
    Arc::new(|mw: &Middleware| {
        let config = parse_config(mw);
        rate_limit_filter(config)
    })
}

fn parse_config(mw: &Middleware) -> RateLimitConfig {
    let value = serde_json::Value::Object(mw.settings.clone().into_iter().collect());
    serde_json::from_value(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    fn app(config: RateLimitConfig) -> Router {
        let filter = rate_limit_filter(config);
        filter(Router::new().route("/", get(|| async { "ok" })))
    }

    async fn send(router: &Router, peer: &str, xff: Option<&str>) -> StatusCode {
        let mut builder = HttpRequest::builder()
            .uri("/")
            .extension(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        if let Some(xff) = xff {
            builder = builder.header("x-forwarded-for", xff);
        }
        let req = builder.body(Body::empty()).unwrap();
        router.clone().oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn proxy_trusted_limits_per_forwarded_for_key() {
        let router = app(RateLimitConfig {
            rps: 5.0,
            burst: 5.0,
            trust_proxy: true,
        });
        for _ in 0..5 {
            assert_eq!(
                send(&router, "10.0.0.1:1", Some("203.0.113.1")).await,
                StatusCode::OK
            );
        }
        assert_eq!(
            send(&router, "10.0.0.1:1", Some("203.0.113.1")).await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            send(&router, "10.0.0.1:1", Some("203.0.113.2")).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn ipv6_forwarded_for_normalizes_to_same_bucket() {
        let router = app(RateLimitConfig {
            rps: 1.0,
            burst: 1.0,
            trust_proxy: true,
        });
        assert_eq!(
            send(&router, "10.0.0.1:1", Some("[::1]")).await,
            StatusCode::OK
        );
        assert_eq!(
            send(&router, "10.0.0.1:1", Some("::1")).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn untrusted_proxy_ignores_forwarded_for() {
        let router = app(RateLimitConfig {
            rps: 1.0,
            burst: 1.0,
            trust_proxy: false,
        });
        assert_eq!(
            send(&router, "10.0.0.1:1", Some("203.0.113.1")).await,
            StatusCode::OK
        );
        // Same peer address regardless of XFF value — shares the bucket.
        assert_eq!(
            send(&router, "10.0.0.1:1", Some("203.0.113.2")).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
