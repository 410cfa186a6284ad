//! `probe-qa.toml` loading.
//!
//! The file is parsed into permissive `*Input` structs and then resolved
//! into the validated [`QaConfig`] the rest of the harness uses. Every key
//! is optional; an empty file yields the defaults.
//!
//! ```toml
//! workdir = "."
//! catalog = "catalogs/whatsapp.json"
//!
//! [probe]
//! binary = "./miniooni"
//! build = ["go", "build", "-v", "./internal/cmd/miniooni"]
//!
//! [probe.env]
//! OONI_HOME = "/tmp/ooni-qa"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{HarnessError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "probe-qa.toml";
pub const DEFAULT_PROBE_BINARY: &str = "./miniooni";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QaConfigInput {
    pub workdir: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub probe: ProbeConfigInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfigInput {
    pub binary: Option<String>,
    pub build: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// A command run once before any scenario, to make sure the measurement
/// tool reflects the current checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub binary: PathBuf,
    pub build: Option<BuildCommand>,
    /// Extra environment for every measurement-tool invocation.
    pub env: BTreeMap<String, String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_PROBE_BINARY),
            build: None,
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaConfig {
    /// Where the ephemeral spec and report files are created.
    pub workdir: PathBuf,
    /// JSON catalog replacing the built-in scenarios.
    pub catalog: Option<PathBuf>,
    pub probe: ProbeConfig,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            catalog: None,
            probe: ProbeConfig::default(),
        }
    }
}

impl QaConfigInput {
    pub fn resolve(self) -> Result<QaConfig> {
        let binary = match self.probe.binary {
            Some(binary) => {
                let trimmed = binary.trim();
                if trimmed.is_empty() {
                    return Err(HarnessError::Config("probe.binary is empty".into()));
                }
                PathBuf::from(trimmed)
            }
            None => PathBuf::from(DEFAULT_PROBE_BINARY),
        };

        let build = match self.probe.build.split_first() {
            None => None,
            Some((program, args)) => {
                let program = program.trim();
                if program.is_empty() {
                    return Err(HarnessError::Config("probe.build has an empty program".into()));
                }
                Some(BuildCommand {
                    program: program.to_string(),
                    args: args.to_vec(),
                })
            }
        };

        if let Some(key) = self.probe.env.keys().find(|k| k.is_empty() || k.contains('=')) {
            return Err(HarnessError::Config(format!(
                "probe.env has an invalid variable name {key:?}"
            )));
        }

        Ok(QaConfig {
            workdir: self.workdir.unwrap_or_else(|| PathBuf::from(".")),
            catalog: self.catalog,
            probe: ProbeConfig {
                binary,
                build,
                env: self.probe.env,
            },
        })
    }
}

impl QaConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(QaConfig::default());
        }
        let parsed: QaConfigInput = toml::from_str(input)
            .map_err(|e| HarnessError::Config(format!("invalid TOML: {e}")))?;
        parsed.resolve()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Loads `path` if given, otherwise `probe-qa.toml` from the current
    /// directory when present, otherwise the defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    tracing::debug!("using {}", default.display());
                    Self::load(default)
                } else {
                    Ok(QaConfig::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_defaults() {
        let cfg = QaConfig::from_toml_str("  \n").unwrap();
        assert_eq!(cfg, QaConfig::default());
        assert_eq!(cfg.probe.binary, PathBuf::from("./miniooni"));
        assert!(cfg.probe.build.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            workdir = "/tmp/qa"
            catalog = "catalogs/whatsapp.json"

            [probe]
            binary = " ./bin/miniooni "
            build = ["go", "build", "-v", "./internal/cmd/miniooni"]

            [probe.env]
            OONI_HOME = "/tmp/ooni-qa"
        "#;

        let cfg = QaConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.workdir, PathBuf::from("/tmp/qa"));
        assert_eq!(cfg.catalog, Some(PathBuf::from("catalogs/whatsapp.json")));
        assert_eq!(cfg.probe.binary, PathBuf::from("./bin/miniooni"));
        let build = cfg.probe.build.unwrap();
        assert_eq!(build.program, "go");
        assert_eq!(build.args, vec!["build", "-v", "./internal/cmd/miniooni"]);
        assert_eq!(build.to_string(), "go build -v ./internal/cmd/miniooni");
        assert_eq!(cfg.probe.env["OONI_HOME"], "/tmp/ooni-qa");
    }

    #[test]
    fn rejects_blank_binary_and_build_program() {
        let err = QaConfig::from_toml_str("[probe]\nbinary = \"  \"\n").unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));

        let err = QaConfig::from_toml_str("[probe]\nbuild = [\"\", \"build\"]\n").unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn rejects_bad_env_names() {
        let err = QaConfig::from_toml_str("[probe.env]\n\"A=B\" = \"x\"\n").unwrap_err();
        assert!(err.to_string().contains("A=B"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = QaConfig::from_toml_str("probe_binary = \"x\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn shipped_example_parses() {
        let cfg = QaConfig::from_toml_str(include_str!("../../../probe-qa.example.toml")).unwrap();
        assert_eq!(cfg.probe.build.unwrap().program, "go");
        assert!(cfg.catalog.is_none());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = QaConfig::load(Path::new("/nonexistent/probe-qa.toml")).unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }
}
