//! CSRF, CORS, security-headers, guardrails, and IP-allowlist HTTP
//! filters.

pub mod cors;
pub mod csrf;
pub mod guardrails;
pub mod ip_allowlist;
pub mod secure_headers;

pub use cors::{cors_filter, factory as cors_factory, CorsConfig};
pub use csrf::{csrf_filter, factory as csrf_factory, CsrfConfig};
pub use guardrails::{factory as guardrails_factory, guardrails_filter, GuardrailsConfig};
pub use ip_allowlist::{factory as ip_allowlist_factory, ip_allowlist_filter, IpAllowlistConfig};
pub use secure_headers::{factory as secure_headers_factory, secure_headers_filter};
