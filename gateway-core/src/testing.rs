//! In-process test doubles shared across this workspace's test suites.
//! This crate's surface is small enough that the doubles live alongside
//! the types they fake rather than in their own crate.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::service::{ServiceInfo, Tool, ToolManager};

/// Minimal in-memory [`ToolManager`] for tests.
#[derive(Default)]
pub struct FakeToolManager {
    tools: RwLock<HashMap<String, Tool>>,
    services: RwLock<HashMap<String, Arc<ServiceInfo>>>,
}

impl FakeToolManager {
    pub fn add_tool(&self, full_name: &str, service_id: &str) {
        self.tools.write().unwrap().insert(
            full_name.to_string(),
            Tool {
                full_name: full_name.to_string(),
                service_id: service_id.to_string(),
            },
        );
    }

    pub fn add_service(&self, info: ServiceInfo) {
        self.services
            .write()
            .unwrap()
            .insert(info.service_id.clone(), Arc::new(info));
    }
}

impl ToolManager for FakeToolManager {
    fn get_tool(&self, full_name: &str) -> Option<Tool> {
        self.tools.read().unwrap().get(full_name).cloned()
    }

    fn get_service_info(&self, service_id: &str) -> Option<Arc<ServiceInfo>> {
        self.services.read().unwrap().get(service_id).cloned()
    }
}

/// One scripted outcome for [`scripted_executor`]: success with a value, or
/// failure with a message wrapped as [`crate::error::FilterError::Upstream`].
pub enum ScriptedOutcome {
    Succeed(serde_json::Value),
    Fail(String),
}

/// Build a terminal [`crate::pipeline::Executor`] that records every call
/// and returns canned results/errors in sequence, repeating the last
/// outcome once the script is exhausted. Used by retry/breaker tests to
/// script "fail twice, then succeed" scenarios.
pub fn scripted_executor(
    outcomes: Vec<ScriptedOutcome>,
) -> (crate::pipeline::Executor, Arc<std::sync::atomic::AtomicUsize>) {
    use crate::error::FilterError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let calls = Arc::new(AtomicUsize::new(0));
    let outcomes = Arc::new(outcomes);
    let calls_clone = calls.clone();
    let executor: crate::pipeline::Executor = Arc::new(move |_req| {
        let calls = calls_clone.clone();
        let outcomes = outcomes.clone();
        Box::pin(async move {
            let index = calls.fetch_add(1, Ordering::SeqCst);
            let pick = index.min(outcomes.len().saturating_sub(1));
            match outcomes.get(pick) {
                Some(ScriptedOutcome::Succeed(value)) => Ok(value.clone()),
                Some(ScriptedOutcome::Fail(message)) => {
                    Err(FilterError::Upstream(Box::new(std::io::Error::other(message.clone()))))
                }
                None => Err(FilterError::Upstream(Box::new(std::io::Error::other(
                    "no scripted outcome",
                )))),
            }
        })
    });
    (executor, calls)
}
