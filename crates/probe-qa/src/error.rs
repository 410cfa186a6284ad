use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Everything that stops a QA run.
///
/// Check mismatches are not errors: they are folded into the run summary so
/// one invocation reports every regression. The variants here are usage
/// errors, harness bugs, or a broken measurement tool, all of which make the
/// remaining comparisons meaningless.
///
/// Underlying I/O and JSON errors are only reachable through `source()`.
#[derive(Debug, Error)]
pub enum HarnessError {
    // ── Usage ───────────────────────────────────────────────────────
    #[error("duplicate scenario name: {0}")]
    DuplicateScenario(String),
    #[error("scenario {0} does not check any tool")]
    EmptyChecks(String),
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("cannot load catalog {}: {reason}", .path.display())]
    Catalog { path: PathBuf, reason: String },

    // ── Harness bugs ────────────────────────────────────────────────
    #[error("scenario {scenario}: unknown verification predicate {name:?}")]
    UnknownPredicate { scenario: String, name: String },

    // ── Measurement tool ────────────────────────────────────────────
    #[error("cannot encode interference spec")]
    SpecEncode(#[source] serde_json::Error),
    #[error("cannot write interference spec {}", .path.display())]
    SpecWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("build command `{command}` failed: {status}")]
    BuildFailed { command: String, status: ExitStatus },
    #[error("`{command}` failed: {status}")]
    ProbeFailed { command: String, status: ExitStatus },
    #[error("cannot read report {}", .path.display())]
    ReportRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("report {} is not valid JSON", .path.display())]
    ReportParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("report {} is not a JSON object", .path.display())]
    ReportNotObject { path: PathBuf },
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
