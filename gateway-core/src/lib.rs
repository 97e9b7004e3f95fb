//! Filter ABI, registry/composer, ambient context, and config schema for
//! the MCP gateway filter core.
//!
//! Everything else in this workspace (`gateway-net`, `gateway-ratelimit`,
//! `gateway-resilience`, `gateway-policy`, `gateway-security`,
//! `gateway-recovery`, `gateway-cache`) builds `ToolFilter`/`HttpFilter`
//! values against the types defined here.

pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod service;
pub mod testing;

pub use config::{
    Action, CallPolicy, CircuitBreakerConfig, ConfigError, DlpConfig, Middleware,
    ResilienceConfig, RetryConfig, Rule,
};
pub use context::AmbientContext;
pub use error::FilterError;
pub use pipeline::{
    compose_http, compose_tool, ExecutionRequest, Executor, ExecutorFuture, HttpFilter,
    HttpHandler, ToolFilter,
};
pub use registry::{HttpFactory, McpFactory, Registry};
pub use service::{ServiceInfo, Tool, ToolManager};
