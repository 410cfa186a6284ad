//! Regression harness for the network measurement tool.
//!
//! Each [`Scenario`] runs the tool's web experiments against a URL while
//! the tool's built-in censorship simulator applies an
//! [`InterferenceSpec`](probe_qa_censor::InterferenceSpec). The resulting
//! reports are checked for structure and compared against the values the
//! tool is known to produce for that kind of interference.
//!
//! - [`catalog`]: the named scenario set, built-in or loaded from JSON
//! - [`driver`]: the [`Probe`] seam and the subprocess implementation
//! - [`verifier`]: structural and semantic report checks
//! - [`runner`]: sequential execution and the pass/fail summary

pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod runner;
pub mod scenario;
pub mod test_util;
pub mod verifier;
pub mod web;

pub use catalog::Catalog;
pub use config::QaConfig;
pub use driver::{Probe, SubprocessProbe};
pub use error::{HarnessError, Result};
pub use runner::{RunSummary, Runner};
pub use scenario::{Scenario, ToolCheck, Verification};
