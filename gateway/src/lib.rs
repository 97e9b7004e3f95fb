//! Assembles every filter crate in this workspace into one
//! [`gateway_core::Registry`] and provides the ambient logging setup the
//! surrounding transport process needs at startup. The transport itself
//! is owned by an external collaborator; this crate only wires the
//! filters that run inside it.

use std::sync::Arc;

use gateway_core::{Registry, ToolManager};
use gateway_resilience::ResilienceManager;

pub use gateway_core::config::{load_middlewares, ConfigError, Middleware};
pub use gateway_cache::{DiskStore, EmbeddingProvider, SemanticCache};

/// Installs a `tracing` subscriber reading `RUST_LOG`, falling back to
/// `info,tower_http=debug`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".parse().unwrap()),
        )
        .init();
}

/// Registers every HTTP and tool-execution filter this workspace ships
/// under the name the config file is expected to reference it by.
pub fn build_registry(tool_manager: Arc<dyn ToolManager>) -> Registry {
    let mut registry = Registry::new();

    // HTTP pipeline.
    registry.register("rate_limit", gateway_ratelimit::factory());
    registry.register("csrf", gateway_security::csrf_factory());
    registry.register("cors", gateway_security::cors_factory());
    registry.register("security_headers", gateway_security::secure_headers_factory());
    registry.register("guardrails", gateway_security::guardrails_factory());
    registry.register("ip_allowlist", gateway_security::ip_allowlist_factory());
    registry.register("recovery", gateway_recovery::recovery_factory());
    registry.register("jsonrpc_compliance", gateway_recovery::json_rpc_compliance_factory());

    // Tool-execution pipeline.
    registry.register_mcp("call_policy", gateway_policy::call_policy_factory(tool_manager.clone()));
    registry.register_mcp("dlp", gateway_policy::dlp_factory());
    registry.register_mcp(
        "resilience",
        gateway_resilience::factory(tool_manager, Arc::new(ResilienceManager::new())),
    );

    registry
}
