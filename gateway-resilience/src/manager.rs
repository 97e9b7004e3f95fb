//! Per-service resilience composition: timeout wraps retry wraps circuit
//! breaker. Instances are created lazily and idempotently per
//! service id, the same "entry-or-insert" pattern the rate limiter uses for
//! its per-key buckets ([`gateway_ratelimit::limiter::RateLimiter::allow`]).

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use gateway_core::config::ResilienceConfig;
use gateway_core::context::AmbientContext;
use gateway_core::error::FilterError;
use gateway_core::pipeline::{ExecutionRequest, Executor, ExecutorFuture, ToolFilter};
use gateway_core::service::ToolManager;
use serde_json::Value;

use crate::breaker::CircuitBreaker;
use crate::retry;

struct ServiceResilience {
    breaker: Option<Arc<CircuitBreaker>>,
    retry: Option<gateway_core::config::RetryConfig>,
    timeout: Option<Duration>,
}

impl ServiceResilience {
    fn from_config(config: &ResilienceConfig) -> Self {
        Self {
            breaker: config
                .circuit_breaker
                .clone()
                .map(|cb| Arc::new(CircuitBreaker::new(cb))),
            retry: config.retry_policy.clone(),
            timeout: config.timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Holds one [`ServiceResilience`] per service, created on first use.
pub struct ResilienceManager {
    per_service: DashMap<String, Arc<ServiceResilience>>,
}

impl ResilienceManager {
    pub fn new() -> Self {
        Self {
            per_service: DashMap::new(),
        }
    }

    fn get_or_create(&self, service_id: &str, config: &ResilienceConfig) -> Arc<ServiceResilience> {
        self.per_service
            .entry(service_id.to_string())
            .or_insert_with(|| Arc::new(ServiceResilience::from_config(config)))
            .clone()
    }
}

impl Default for ResilienceManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_resilient(
    resilience: Arc<ServiceResilience>,
    ctx: AmbientContext,
    next: Executor,
    req: ExecutionRequest,
) -> Result<Value, FilterError> {
    let breaker = resilience.breaker.clone();
    let op = move || {
        let next = next.clone();
        let req = req.clone();
        let breaker = breaker.clone();
        async move {
            let permit = match &breaker {
                Some(b) => Some(b.try_acquire()?),
                None => None,
            };
            let result = next(req).await;
            if let (Some(b), Some(permit)) = (&breaker, permit) {
                match &result {
                    Ok(_) => b.record_success(permit),
                    Err(_) => b.record_failure(permit),
                }
            }
            result
        }
    };

    match &resilience.retry {
        Some(retry_config) => retry::run_with_retry(retry_config, &ctx, op).await,
        None => op().await,
    }
}

/// Build the tool-execution filter that applies per-service timeout, retry,
/// and circuit breaking ahead of `next`. `tool_manager` supplies
/// each service's [`ResilienceConfig`]; services with no resilience config
/// pass straight through.
pub fn resilience_filter(tool_manager: Arc<dyn ToolManager>, manager: Arc<ResilienceManager>) -> ToolFilter {
    Arc::new(move |next: Executor| {
        let tool_manager = tool_manager.clone();
        let manager = manager.clone();
        let next2 = next.clone();
        Arc::new(move |req: ExecutionRequest| -> ExecutorFuture {
            let tool_manager = tool_manager.clone();
            let manager = manager.clone();
            let next = next2.clone();
            Box::pin(async move {
                let Some(tool) = tool_manager.get_tool(&req.tool_name) else {
                    return next(req).await;
                };
                let resilience_config = tool_manager
                    .get_service_info(&tool.service_id)
                    .and_then(|info| info.resilience.clone());

                let Some(config) = resilience_config else {
                    return next(req).await;
                };

                let service_resilience = manager.get_or_create(&tool.service_id, &config);
                let ctx = req.context.clone();
                let timeout = service_resilience.timeout;
                let fut = run_resilient(service_resilience, ctx, next, req);

                match timeout {
                    Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                        Ok(result) => result,
                        Err(_) => Err(FilterError::DeadlineExceeded),
                    },
                    None => fut.await,
                }
            })
        })
    })
}

/// Registry factory: ignores the passed-in `Middleware` since resilience
/// config lives per-service on `ServiceInfo`, not on middleware settings.
pub fn factory(tool_manager: Arc<dyn ToolManager>, manager: Arc<ResilienceManager>) -> gateway_core::McpFactory {
    Arc::new(move |_mw: &gateway_core::Middleware| resilience_filter(tool_manager.clone(), manager.clone()))
}
