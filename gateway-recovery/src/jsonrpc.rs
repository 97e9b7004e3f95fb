//! JSON-RPC compliance filter: rewrites a non-JSON error
//! response into a JSON-RPC 2.0 error envelope so every error the gateway
//! returns, including ones raised by [`crate::recovery`] or the framework
//! below it, is valid JSON-RPC. A response that is already JSON is left
//! untouched — rewriting an already-compliant envelope is a no-op.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use gateway_core::{HttpFactory, HttpFilter, HttpHandler, Middleware};
use serde_json::json;

pub fn json_rpc_compliance_filter() -> HttpFilter {
    Arc::new(|next: HttpHandler| next.layer(axum::middleware::from_fn(handle)))
}

/// Registry factory. Takes no config — the error mapping is fixed.
pub fn factory() -> HttpFactory {
    Arc::new(|_mw: &Middleware| json_rpc_compliance_filter())
}

async fn handle(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    if response.status().as_u16() < 400 {
        return response;
    }
    if is_json(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };
    let original = String::from_utf8_lossy(&bytes).to_string();
    let (code, message) = classify(&original);

    let envelope = json!({
        "jsonrpc": "2.0",
        "id": null,
        "error": {
            "code": code,
            "message": message,
            "data": original,
        },
    });
    let payload = serde_json::to_vec(&envelope).expect("json-rpc envelope always serializes");

    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.headers.insert(
        CONTENT_LENGTH,
        HeaderValue::from_str(&payload.len().to_string()).expect("digit string is valid header value"),
    );
    Response::from_parts(parts, Body::from(payload))
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

fn classify(original: &str) -> (i32, &'static str) {
    let lower = original.to_lowercase();
    if lower.contains("parse error") || lower.contains("malformed") || lower.contains("invalid character") {
        (-32700, "Parse error")
    } else if lower.contains("invalid request") || original == "Bad Request" {
        (-32600, "Invalid Request")
    } else if lower.contains("method not found") || lower.contains("not handled") || lower.contains("unsupported") {
        (-32601, "Method not found")
    } else if lower.contains("invalid params") {
        (-32602, "Invalid params")
    } else {
        (-32603, "Internal error")
    }
}
