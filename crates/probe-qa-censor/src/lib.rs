//! Censorship-simulation rules for the measurement tool under test.
//!
//! The measurement tool accepts a `--censor <file>` flag pointing at a JSON
//! document that describes which DNS lookups, TCP/UDP endpoints, TLS SNIs
//! and HTTP hosts it should pretend are being interfered with. This crate
//! models that document:
//!
//! - **Faults**: the per-category actions (`nxdomain`, `tcp-drop-syn`, ...)
//! - **Endpoints**: `ip:port/proto` keys with bracketed IPv6 literals
//! - **InterferenceSpec**: the full document, its builder, and its
//!   canonical JSON encoding
//!
//! Nothing here validates semantics. The measurement tool is the authority
//! on what it accepts; [`InterferenceSpec::lint`] only points out rules that
//! are unlikely to have any effect.

pub mod endpoint;
pub mod fault;
pub mod interference;

pub use endpoint::{Endpoint, EndpointParseError, Transport};
pub use fault::{DnsFault, EndpointFault, HttpFault, TlsFault};
pub use interference::{
    hijack_popular_dns_servers, InterferenceBuilder, InterferenceSpec, LintWarning,
};
