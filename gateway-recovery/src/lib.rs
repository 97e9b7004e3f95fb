//! Panic recovery and JSON-RPC error-envelope compliance HTTP filters.

pub mod jsonrpc;
pub mod recovery;

pub use jsonrpc::{factory as json_rpc_compliance_factory, json_rpc_compliance_filter};
pub use recovery::{factory as recovery_factory, recovery_filter};
