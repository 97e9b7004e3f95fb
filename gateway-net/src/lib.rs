//! Client identity extraction, CIDR matching, and origin allowlisting —
//! the small, widely-shared primitives of the MCP gateway filter core.

pub mod cidr;
pub mod client_id;
pub mod origin;

pub use cidr::CidrMatcher;
pub use client_id::client_key;
pub use origin::{OriginMatch, OriginMatcher};
