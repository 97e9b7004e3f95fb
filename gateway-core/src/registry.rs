//! Named filter factories and ordered instantiation from config.
//!
//! Deliberately a plain value rather than a process singleton: construct
//! a `Registry` at startup and pass it around, so tests can build a fresh
//! one per case instead of sharing global state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Middleware;
use crate::pipeline::{HttpFilter, ToolFilter};

pub type HttpFactory = Arc<dyn Fn(&Middleware) -> HttpFilter + Send + Sync>;
pub type McpFactory = Arc<dyn Fn(&Middleware) -> ToolFilter + Send + Sync>;

#[derive(Default)]
pub struct Registry {
    http_factories: HashMap<String, HttpFactory>,
    mcp_factories: HashMap<String, McpFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: HttpFactory) {
        self.http_factories.insert(name.into(), factory);
    }

    pub fn register_mcp(&mut self, name: impl Into<String>, factory: McpFactory) {
        self.mcp_factories.insert(name.into(), factory);
    }

    /// Ordered HTTP filter instances for `configs`: entries whose `disabled`
    /// flag is set, or whose name names no registered factory, are skipped
    /// (the latter logged at `warn`). Order is ascending `priority`; ties
    /// break by position in `configs`.
    pub fn http_middlewares(&self, configs: &[Middleware]) -> Vec<HttpFilter> {
        ordered(configs, &self.http_factories, "HTTP")
    }

    /// Tool-execution pipeline counterpart of [`Registry::http_middlewares`].
    pub fn mcp_middlewares(&self, configs: &[Middleware]) -> Vec<ToolFilter> {
        ordered(configs, &self.mcp_factories, "MCP")
    }
}

fn ordered<F: Clone>(
    configs: &[Middleware],
    factories: &HashMap<String, Arc<dyn Fn(&Middleware) -> F + Send + Sync>>,
    kind: &'static str,
) -> Vec<F> {
    let mut selected: Vec<(usize, &Middleware, &Arc<dyn Fn(&Middleware) -> F + Send + Sync>)> =
        Vec::new();
    for (index, config) in configs.iter().enumerate() {
        if config.disabled {
            continue;
        }
        match factories.get(&config.name) {
            Some(factory) => selected.push((index, config, factory)),
            None => {
                tracing::warn!(filter = %config.name, kind, "unknown filter name, skipping");
            }
        }
    }
    selected.sort_by_key(|(index, config, _)| (config.priority, *index));
    selected
        .into_iter()
        .map(|(_, config, factory)| factory(config))
        .collect()
}
