//! Call-policy evaluation and DLP redaction.

pub mod call_policy;
pub mod dlp;

pub use call_policy::{call_policy_filter, factory as call_policy_factory};
pub use dlp::{dlp_filter, factory as dlp_factory, REDACTION_TOKEN};
