//! CORS filter: exact match reflects the origin with
//! credentials; wildcard-only mode sets `*` and never includes credentials;
//! no match is a silent pass-through (the browser enforces).

use std::sync::Arc;

use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use gateway_core::{HttpFactory, HttpFilter, HttpHandler, Middleware};
use gateway_net::{OriginMatch, OriginMatcher};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

pub fn cors_filter(config: CorsConfig) -> HttpFilter {
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
    let origin = req
        .headers()
        .get(axum::http::header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let Some(origin) = origin else {
        return if *req.method() == Method::OPTIONS {
            StatusCode::OK.into_response()
        } else {
            next.run(req).await
        };
    };

    let is_preflight = *req.method() == Method::OPTIONS;
    let mut response = if is_preflight {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    match matcher.matches(&origin) {
        OriginMatch::Exact => {
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&origin) {
                headers.insert("access-control-allow-origin", value);
            }
            headers.insert("vary", HeaderValue::from_static("Origin"));
            headers.insert(
                "access-control-allow-credentials",
                HeaderValue::from_static("true"),
            );
        }
        OriginMatch::Wildcard => {
            response
                .headers_mut()
                .insert("access-control-allow-origin", HeaderValue::from_static("*"));
        }
        OriginMatch::None => {}
    }

    response
}

/// Registry factory: parses `Middleware.settings` into [`CorsConfig`].
pub fn factory() -> HttpFactory {
    Arc::new(|mw: &Middleware| {
        let value = serde_json::Value::Object(mw.settings.clone().into_iter().collect());
        let config: CorsConfig = serde_json::from_value(value).unwrap_or_default();
        cors_filter(config)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    fn app(config: CorsConfig) -> Router {
        let filter = cors_filter(config);
        filter(Router::new().route("/", get(|| async { "ok" })))
    }

    #[tokio::test]
    async fn no_origin_header_passes_through_untouched() {
        let router = app(CorsConfig::default());
        let req = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
        let response = router.oneshot(req).await.unwrap();
        assert!(!response.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn exact_match_reflects_origin_with_credentials() {
        let router = app(CorsConfig {
            allowed_origins: vec!["https://app.example.com".into()],
        });
        let req = HttpRequest::builder()
            .uri("/")
            .header("origin", "https://app.example.com")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "https://app.example.com"
        );
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-credentials")
                .unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn wildcard_only_omits_credentials() {
        let router = app(CorsConfig {
            allowed_origins: vec!["*".into()],
        });
        let req = HttpRequest::builder()
            .uri("/")
            .header("origin", "https://anywhere.example")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        assert!(!response
            .headers()
            .contains_key("access-control-allow-credentials"));
    }

    #[tokio::test]
    async fn unlisted_origin_gets_no_cors_headers() {
        let router = app(CorsConfig {
            allowed_origins: vec!["https://app.example.com".into()],
        });
        let req = HttpRequest::builder()
            .uri("/")
            .header("origin", "https://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(req).await.unwrap();
        assert!(!response.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn preflight_short_circuits_with_200() {
        let router = app(CorsConfig {
            allowed_origins: vec!["https://app.example.com".into()],
        });
        let req = HttpRequest::builder()
            .method("OPTIONS")
            .uri("/")
            .header("origin", "https://app.example.com")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("access-control-allow-origin"));
    }
}
