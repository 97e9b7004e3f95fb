//! The filter ABI: two higher-order function shapes, one per pipeline.
//!
//! Expressed as a single higher-order function over the terminal
//! executor's shape rather than a class hierarchy — a filter is just
//! `Fn(next) -> next'`, composed by a left fold over an ordered list
//! (see [`crate::registry::Registry`]).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::Router;
use bytes::Bytes;
use serde_json::Value;

use crate::context::AmbientContext;
use crate::error::FilterError;

/// The unit of work flowing through the tool-execution pipeline.
#[derive(Clone)]
pub struct ExecutionRequest {
    pub tool_name: String,
    pub inputs: Bytes,
    pub request_id: Option<String>,
    pub context: AmbientContext,
}

impl ExecutionRequest {
    pub fn new(tool_name: impl Into<String>, inputs: impl Into<Bytes>) -> Self {
        Self {
            tool_name: tool_name.into(),
            inputs: inputs.into(),
            request_id: None,
            context: AmbientContext::new(),
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_context(mut self, context: AmbientContext) -> Self {
        self.context = context;
        self
    }

    /// `service` portion of the dotted `service.tool` name, if present.
    pub fn service_id(&self) -> Option<&str> {
        self.tool_name.split_once('.').map(|(svc, _)| svc)
    }

    /// Parse the request's raw JSON inputs. Used by filters that need the
    /// decoded form (DLP, call-policy argument matching).
    pub fn parsed_inputs(&self) -> Result<Value, FilterError> {
        serde_json::from_slice(&self.inputs).map_err(|e| FilterError::PolicyArgsUnserializable {
            message: e.to_string(),
        })
    }

    /// Replace the raw inputs with the re-serialized form of `value`.
    pub fn set_parsed_inputs(&mut self, value: &Value) -> Result<(), FilterError> {
        let bytes = serde_json::to_vec(value).map_err(|e| FilterError::PolicyArgsUnserializable {
            message: e.to_string(),
        })?;
        self.inputs = Bytes::from(bytes);
        Ok(())
    }
}

pub type ExecutorFuture = Pin<Box<dyn Future<Output = Result<Value, FilterError>> + Send>>;

/// The terminal shape of the tool-execution pipeline: `(ctx, req) -> (result, error)`.
pub type Executor = Arc<dyn Fn(ExecutionRequest) -> ExecutorFuture + Send + Sync>;

/// `fn(nextExecutor) -> executor`.
pub type ToolFilter = Arc<dyn Fn(Executor) -> Executor + Send + Sync>;

/// The terminal shape of the HTTP pipeline. Modeled as `Router -> Router`
/// (a layer application) rather than a bare handler function — the first
/// filter in registration order ends up as the outermost `.layer()` call,
/// so it observes the request first and the response last.
pub type HttpHandler = Router;

/// `fn(nextHandler) -> handler`.
pub type HttpFilter = Arc<dyn Fn(HttpHandler) -> HttpHandler + Send + Sync>;

/// Fold an ordered list of HTTP filters around a terminal router. `filters`
/// must already be in priority order (the first filter sees the request
/// first); this function takes care of reversing the fold so that ordering
/// is preserved under Axum's "last `.layer()` call is outermost" semantics.
pub fn compose_http(terminal: HttpHandler, filters: &[HttpFilter]) -> HttpHandler {
    let mut handler = terminal;
    for filter in filters.iter().rev() {
        handler = filter(handler);
    }
    handler
}

/// Fold an ordered list of tool filters around a terminal executor, same
/// ordering convention as [`compose_http`].
pub fn compose_tool(terminal: Executor, filters: &[ToolFilter]) -> Executor {
    let mut executor = terminal;
    for filter in filters.iter().rev() {
        executor = filter(executor);
    }
    executor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn terminal() -> Executor {
        Arc::new(|_req| Box::pin(async { Ok(Value::Null) }))
    }

    fn marker_filter(order: Arc<std::sync::Mutex<Vec<&'static str>>>, name: &'static str) -> ToolFilter {
        Arc::new(move |next: Executor| {
            let order = order.clone();
            Arc::new(move |req: ExecutionRequest| {
                let order = order.clone();
                let next = next.clone();
                Box::pin(async move {
                    order.lock().unwrap().push(name);
                    let result = next(req).await;
                    order.lock().unwrap().push(name);
                    result
                })
            })
        })
    }

    #[tokio::test]
    async fn composition_preserves_pre_and_post_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let filters = vec![
            marker_filter(order.clone(), "outer"),
            marker_filter(order.clone(), "inner"),
        ];
        let exec = compose_tool(terminal(), &filters);
        let req = ExecutionRequest::new("svc.tool", Bytes::from_static(b"{}"));
        exec(req).await.unwrap();

        let seen = order.lock().unwrap().clone();
        assert_eq!(seen, vec!["outer", "inner", "inner", "outer"]);
    }

    #[tokio::test]
    async fn concurrent_calls_yield_independent_outcomes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let exec: Executor = {
            let counter = counter.clone();
            Arc::new(move |req: ExecutionRequest| {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::String(req.tool_name))
                })
            })
        };

        let mut handles = Vec::new();
        for i in 0..16 {
            let exec = exec.clone();
            handles.push(tokio::spawn(async move {
                let req = ExecutionRequest::new(format!("svc.tool{i}"), Bytes::from_static(b"{}"));
                exec(req).await.unwrap()
            }));
        }
        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap());
        }
        assert_eq!(counter.load(Ordering::SeqCst), 16);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r, &Value::String(format!("svc.tool{i}")));
        }
    }

    #[test]
    fn service_id_splits_dotted_tool_name() {
        let req = ExecutionRequest::new("billing.charge_card", Bytes::from_static(b"{}"));
        assert_eq!(req.service_id(), Some("billing"));
    }
}
