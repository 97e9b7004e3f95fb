//! Ordered call-policy evaluation against precompiled rule regexes.
//! Compiled forms are cached per service id and invalidated
//! whenever the tool manager hands out a new [`ServiceInfo`] snapshot
//! (compared by `Arc` identity, not by value) — mirroring how
//! `gateway_net::CidrMatcher` swaps its whole structure under a lock on
//! reload rather than diffing entry by entry.

use std::sync::Arc;

use dashmap::DashMap;
use gateway_core::config::{Action, CallPolicy, Rule};
use gateway_core::error::FilterError;
use gateway_core::pipeline::{ExecutionRequest, Executor, ExecutorFuture, ToolFilter};
use gateway_core::service::{ServiceInfo, ToolManager};
use regex::Regex;

struct CompiledRule {
    action: Action,
    name_regex: Option<Regex>,
    argument_regex: Option<Regex>,
}

struct CompiledPolicy {
    default_action: Action,
    rules: Vec<CompiledRule>,
}

enum Outcome {
    Allow,
    Deny { is_default: bool },
    RequireApproval,
}

fn compile_rule(service_id: &str, rule: &Rule) -> CompiledRule {
    let name_regex = rule.name_regex.as_deref().and_then(|pattern| {
        Regex::new(pattern)
            .map_err(|e| {
                tracing::warn!(service = service_id, pattern, error = %e, "call policy name_regex failed to compile, rule will never match on name");
                e
            })
            .ok()
    });
    let argument_regex = rule.argument_regex.as_deref().and_then(|pattern| {
        Regex::new(pattern)
            .map_err(|e| {
                tracing::warn!(service = service_id, pattern, error = %e, "call policy argument_regex failed to compile, rule will never match on arguments");
                e
            })
            .ok()
    });
    CompiledRule {
        action: rule.action.unwrap_or(Action::Allow),
        name_regex,
        argument_regex,
    }
}

fn compile_policy(service_id: &str, policy: &CallPolicy) -> CompiledPolicy {
    CompiledPolicy {
        default_action: policy.default_action,
        rules: policy.rules.iter().map(|r| compile_rule(service_id, r)).collect(),
    }
}

fn evaluate_policy(policy: &CompiledPolicy, tool_name: &str, args_json: &str) -> Outcome {
    for rule in &policy.rules {
        let name_ok = rule
            .name_regex
            .as_ref()
            .map(|re| re.is_match(tool_name))
            .unwrap_or(true);
        let args_ok = rule
            .argument_regex
            .as_ref()
            .map(|re| re.is_match(args_json))
            .unwrap_or(true);
        if name_ok && args_ok {
            return match rule.action {
                Action::Allow => Outcome::Allow,
                Action::Deny => Outcome::Deny { is_default: false },
                Action::RequireApproval => Outcome::RequireApproval,
            };
        }
    }
    match policy.default_action {
        Action::Allow => Outcome::Allow,
        Action::Deny => Outcome::Deny { is_default: true },
        Action::RequireApproval => Outcome::RequireApproval,
    }
}

struct CachedCompiled {
    source: Arc<ServiceInfo>,
    compiled: Arc<Vec<CompiledPolicy>>,
}

struct State {
    tool_manager: Arc<dyn ToolManager>,
    cache: DashMap<String, CachedCompiled>,
}

impl State {
    fn compiled_policies(&self, info: &Arc<ServiceInfo>) -> Arc<Vec<CompiledPolicy>> {
        if let Some(entry) = self.cache.get(&info.service_id) {
            if Arc::ptr_eq(&entry.source, info) {
                return entry.compiled.clone();
            }
        }
        let compiled = Arc::new(
            info.call_policies
                .iter()
                .map(|p| compile_policy(&info.service_id, p))
                .collect::<Vec<_>>(),
        );
        self.cache.insert(
            info.service_id.clone(),
            CachedCompiled {
                source: info.clone(),
                compiled: compiled.clone(),
            },
        );
        compiled
    }
}

/// Build the call-policy tool filter. Missing service info for a recognized
/// tool is fail-closed; a service with no configured policies is a
/// pass-through.
pub fn call_policy_filter(tool_manager: Arc<dyn ToolManager>) -> ToolFilter {
    let state = Arc::new(State {
        tool_manager,
        cache: DashMap::new(),
    });
    Arc::new(move |next: Executor| {
        let state = state.clone();
        let next_outer = next.clone();
        Arc::new(move |req: ExecutionRequest| -> ExecutorFuture {
            let state = state.clone();
            let next = next_outer.clone();
            Box::pin(async move {
                let Some(tool) = state.tool_manager.get_tool(&req.tool_name) else {
                    return Err(FilterError::PolicyMissingContext);
                };
                let Some(info) = state.tool_manager.get_service_info(&tool.service_id) else {
                    return Err(FilterError::PolicyMissingContext);
                };
                if info.call_policies.is_empty() {
                    return next(req).await;
                }

                let parsed = req.parsed_inputs()?;
                let args_json = serde_json::to_string(&parsed).map_err(|e| {
                    FilterError::PolicyArgsUnserializable {
                        message: e.to_string(),
                    }
                })?;

                let compiled = state.compiled_policies(&info);
                for policy in compiled.iter() {
                    match evaluate_policy(policy, &req.tool_name, &args_json) {
                        Outcome::Allow => continue,
                        Outcome::Deny { is_default } => {
                            return Err(FilterError::policy_denied(is_default))
                        }
                        Outcome::RequireApproval => return Err(FilterError::ApprovalRequired),
                    }
                }
                next(req).await
            })
        })
    })
}

/// Registry-facing factory. Call policies live on [`ServiceInfo`], not on
/// `Middleware.settings`, so the factory ignores its config argument and
/// only needs `tool_manager` bound at wiring time.
pub fn factory(tool_manager: Arc<dyn ToolManager>) -> gateway_core::McpFactory {
    Arc::new(move |_mw: &gateway_core::Middleware| call_policy_filter(tool_manager.clone()))
}
