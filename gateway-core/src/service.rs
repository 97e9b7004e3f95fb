//! The tool-manager contract this crate consumes. An external tool
//! manager supplies the implementation; this crate only defines the
//! read-only shape filters observe.

use std::sync::Arc;

use crate::config::{CallPolicy, DlpConfig, ResilienceConfig};

/// A named callable exposed by a service, identified as `<service>.<tool>`.
#[derive(Debug, Clone)]
pub struct Tool {
    pub full_name: String,
    pub service_id: String,
}

/// Per-upstream record consumed read-only by filters. Filters must tolerate
/// concurrent replacement — callers hand out `Arc<ServiceInfo>` so an
/// in-flight filter keeps seeing the snapshot it started with even if the
/// tool manager swaps in a new one mid-request.
#[derive(Debug, Clone, Default)]
pub struct ServiceInfo {
    pub service_id: String,
    pub display_name: String,
    pub resilience: Option<ResilienceConfig>,
    pub call_policies: Vec<CallPolicy>,
    pub dlp: DlpConfig,
}

/// Read-only lookups a tool manager must answer: resolve a callable name
/// to its owning service, and fetch per-service config.
pub trait ToolManager: Send + Sync {
    fn get_tool(&self, full_name: &str) -> Option<Tool>;
    fn get_service_info(&self, service_id: &str) -> Option<Arc<ServiceInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeToolManager;

    #[test]
    fn fake_manager_round_trips_tool_and_service() {
        let mgr = FakeToolManager::default();
        mgr.add_tool("billing.charge", "billing");
        mgr.add_service(ServiceInfo {
            service_id: "billing".into(),
            display_name: "Billing".into(),
            ..Default::default()
        });

        let tool = mgr.get_tool("billing.charge").unwrap();
        assert_eq!(tool.service_id, "billing");
        assert!(mgr.get_service_info(&tool.service_id).is_some());
        assert!(mgr.get_tool("missing.tool").is_none());
    }
}
