//! Running the measurement tool.
//!
//! [`SubprocessProbe`] writes the scenario's interference spec to a
//! temporary file, runs
//! `<binary> -n --censor <spec> -o <report> [-i <input>] <tool>` and parses
//! the JSON report it leaves behind. Both files live in the working
//! directory under random `tmp-<hex>.json` names and are removed when the
//! measurement finishes, whether it succeeded or not.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

use crate::config::{BuildCommand, QaConfig};
use crate::error::{HarnessError, Result};
use crate::scenario::Scenario;

/// Produces a measurement report for one tool under one scenario.
pub trait Probe {
    fn measure(&self, scenario: &Scenario, tool: &str) -> Result<Value>;
}

impl<P: Probe + ?Sized> Probe for &P {
    fn measure(&self, scenario: &Scenario, tool: &str) -> Result<Value> {
        (**self).measure(scenario, tool)
    }
}

/// A file path that is deleted when dropped.
///
/// The file itself is not created; the owner (or a child process) writes it.
#[derive(Debug)]
pub struct EphemeralFile {
    path: PathBuf,
}

impl EphemeralFile {
    /// Picks a fresh `tmp-<32 hex>.json` name inside `dir`.
    pub fn reserve(dir: &Path) -> Self {
        Self {
            path: dir.join(temp_file_name()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EphemeralFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("cannot remove {}: {e}", self.path.display()),
        }
    }
}

/// 128 random bits from the thread-local CSPRNG, hex encoded.
pub fn temp_file_name() -> String {
    format!("tmp-{:032x}.json", rand::random::<u128>())
}

#[derive(Debug, Clone)]
pub struct SubprocessProbe {
    binary: PathBuf,
    workdir: PathBuf,
    env: BTreeMap<String, String>,
}

impl SubprocessProbe {
    pub fn new(binary: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            workdir: workdir.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &QaConfig) -> Self {
        Self {
            binary: config.probe.binary.clone(),
            workdir: config.workdir.clone(),
            env: config.probe.env.clone(),
        }
    }

    /// Sets an environment variable for every invocation.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

impl Probe for SubprocessProbe {
    fn measure(&self, scenario: &Scenario, tool: &str) -> Result<Value> {
        for warning in scenario.interference.lint() {
            tracing::warn!(scenario = %scenario.name, "{warning}");
        }

        let spec_bytes = scenario
            .interference
            .to_json_bytes()
            .map_err(HarnessError::SpecEncode)?;
        let spec = EphemeralFile::reserve(&self.workdir);
        fs::write(spec.path(), &spec_bytes).map_err(|source| HarnessError::SpecWrite {
            path: spec.path().to_path_buf(),
            source,
        })?;
        let report = EphemeralFile::reserve(&self.workdir);

        let mut cmd = Command::new(&self.binary);
        cmd.arg("-n")
            .arg("--censor")
            .arg(spec.path())
            .arg("-o")
            .arg(report.path());
        if let Some(input) = &scenario.input {
            cmd.arg("-i").arg(input);
        }
        cmd.arg(tool).envs(&self.env);

        let command = command_line(&cmd);
        tracing::info!("+ {command}");
        let status = cmd.status().map_err(|source| HarnessError::Spawn {
            program: self.binary.display().to_string(),
            source,
        })?;
        if !status.success() {
            return Err(HarnessError::ProbeFailed { command, status });
        }

        read_report(report.path())
    }
}

/// Reads a report written by the tool; it must be a JSON object.
pub fn read_report(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|source| HarnessError::ReportRead {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| HarnessError::ReportParse {
        path: path.to_path_buf(),
        source,
    })?;
    if !value.is_object() {
        return Err(HarnessError::ReportNotObject {
            path: path.to_path_buf(),
        });
    }
    Ok(value)
}

/// Runs the configured build command from the current directory, where the
/// probe binary path is resolved; a non-zero exit is fatal.
pub fn run_build(build: &BuildCommand) -> Result<()> {
    let command = build.to_string();
    tracing::info!("+ {command}");
    let status = Command::new(&build.program)
        .args(&build.args)
        .status()
        .map_err(|source| HarnessError::Spawn {
            program: build.program.clone(),
            source,
        })?;
    if !status.success() {
        return Err(HarnessError::BuildFailed { command, status });
    }
    Ok(())
}

fn command_line(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_names_are_random_hex() {
        let a = temp_file_name();
        let b = temp_file_name();
        assert_ne!(a, b);
        for name in [&a, &b] {
            let hex = name
                .strip_prefix("tmp-")
                .and_then(|s| s.strip_suffix(".json"))
                .unwrap();
            assert_eq!(hex.len(), 32);
            assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn ephemeral_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let file = EphemeralFile::reserve(dir.path());
            fs::write(file.path(), b"{}").unwrap();
            assert!(file.path().exists());
            file.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn dropping_an_unwritten_reservation_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        drop(EphemeralFile::reserve(dir.path()));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn read_report_rejects_non_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        fs::write(&path, b"[1, 2]").unwrap();
        assert!(matches!(
            read_report(&path),
            Err(HarnessError::ReportNotObject { .. })
        ));

        fs::write(&path, b"{\"test_keys\":").unwrap();
        assert!(matches!(
            read_report(&path),
            Err(HarnessError::ReportParse { .. })
        ));

        fs::write(&path, b"{\"test_keys\": {}}").unwrap();
        assert!(read_report(&path).unwrap().is_object());
    }

    #[test]
    fn read_report_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_report(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, HarnessError::ReportRead { .. }));
    }

    #[test]
    fn command_line_lists_every_argument() {
        let mut cmd = Command::new("./miniooni");
        cmd.args(["-n", "--censor", "tmp-1.json", "-i", "https://x/", "websteps"]);
        assert_eq!(
            command_line(&cmd),
            "./miniooni -n --censor tmp-1.json -i https://x/ websteps"
        );
    }

    #[test]
    fn spawn_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let probe = SubprocessProbe::new(dir.path().join("no-such-binary"), dir.path());
        let scenario = Scenario::new(
            "s",
            "d",
            "https://example.org/",
            probe_qa_censor::InterferenceSpec::default(),
        );
        let err = probe.measure(&scenario, "websteps").unwrap_err();
        assert!(matches!(err, HarnessError::Spawn { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
