//! IP allowlist filter, built directly on [`gateway_net::CidrMatcher`].
//! An empty allowlist allows everything; denial responds `403 Forbidden`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use gateway_core::{HttpFactory, HttpFilter, HttpHandler, Middleware};
use gateway_net::CidrMatcher;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpAllowlistConfig {
    #[serde(default)]
    pub allowed_cidrs: Vec<String>,
}

pub fn ip_allowlist_filter(config: IpAllowlistConfig) -> HttpFilter {
    let matcher = Arc::new(CidrMatcher::new(&config.allowed_cidrs));
    Arc::new(move |next: HttpHandler| {
        let matcher = matcher.clone();
        next.layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            let matcher = matcher.clone();
            async move { handle(matcher, req, next).await }
        }))
    })
}

async fn handle(matcher: Arc<CidrMatcher>, req: Request, next: Next) -> Response {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.ip().to_string())
        .unwrap_or_default();
    if matcher.allows(&remote_ip) {
        next.run(req).await
    } else {
        (StatusCode::FORBIDDEN, "Forbidden").into_response()
    }
}

/// Registry factory: parses `Middleware.settings` into [`IpAllowlistConfig`].
pub fn factory() -> HttpFactory {
    Arc::new(|mw: &Middleware| {
        let value = serde_json::Value::Object(mw.settings.clone().into_iter().collect());
        let config: IpAllowlistConfig = serde_json::from_value(value).unwrap_or_default();
        ip_allowlist_filter(config)
    })
}
