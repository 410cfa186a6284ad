//! Stand-in for the measurement tool in integration tests.
//!
//! Accepts `-n --censor <spec> -o <report> [-i <input>] <tool>` and writes a
//! report that passes the structural checks. Behaviour is steered through
//! the environment:
//!
//! - `FAKE_PROBE_TEST_KEYS`: JSON value used as `test_keys` (default `{}`)
//! - `FAKE_PROBE_OVERRIDES`: JSON object merged into the top-level report
//! - `FAKE_PROBE_REPORT`: `garbage`, `array` or `missing` to break the report
//! - `FAKE_PROBE_EXIT`: exit with this status without writing anything
//! - `FAKE_PROBE_RECORD`: directory receiving `<tool>.args.json` and a copy
//!   of the spec as `<tool>.censor.json`

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use probe_qa::test_util::conforming_report;
use serde_json::{json, Value};

#[derive(Debug, Default)]
struct Args {
    all: Vec<String>,
    no_collector: bool,
    censor: Option<PathBuf>,
    output: Option<PathBuf>,
    input: Option<String>,
    tool: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut parsed = Args {
        all: std::env::args().skip(1).collect(),
        ..Args::default()
    };
    let mut args = parsed.all.clone().into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-n" => parsed.no_collector = true,
            "--censor" => parsed.censor = Some(args.next().context("missing --censor value")?.into()),
            "-o" => parsed.output = Some(args.next().context("missing -o value")?.into()),
            "-i" => parsed.input = Some(args.next().context("missing -i value")?),
            other if other.starts_with('-') => bail!("unexpected flag {other}"),
            other => {
                if parsed.tool.replace(other.to_string()).is_some() {
                    bail!("more than one experiment name");
                }
            }
        }
    }
    Ok(parsed)
}

fn env_json(key: &str) -> Result<Option<Value>> {
    match std::env::var(key) {
        Ok(text) => Ok(Some(
            serde_json::from_str(&text).with_context(|| format!("{key} is not JSON"))?,
        )),
        Err(_) => Ok(None),
    }
}

fn record(dir: &Path, tool: &str, args: &Args, censor: &Path) -> Result<()> {
    std::fs::write(
        dir.join(format!("{tool}.args.json")),
        serde_json::to_vec(&args.all)?,
    )?;
    std::fs::copy(censor, dir.join(format!("{tool}.censor.json")))
        .with_context(|| format!("copying {}", censor.display()))?;
    Ok(())
}

fn run() -> Result<u8> {
    let args = parse_args()?;
    if !args.no_collector {
        bail!("refusing to submit measurements: -n is required");
    }
    let censor = args.censor.clone().context("--censor is required")?;
    let output = args.output.clone().context("-o is required")?;
    let input = args.input.clone();
    let tool = args.tool.clone().context("experiment name is required")?;

    // The spec must be readable JSON before the tool starts.
    let spec: Value = serde_json::from_slice(
        &std::fs::read(&censor).with_context(|| format!("reading {}", censor.display()))?,
    )?;
    if !spec.is_object() {
        bail!("censor spec is not an object");
    }

    if let Ok(dir) = std::env::var("FAKE_PROBE_RECORD") {
        record(Path::new(&dir), &tool, &args, &censor)?;
    }

    if let Ok(code) = std::env::var("FAKE_PROBE_EXIT") {
        return Ok(code.parse().context("FAKE_PROBE_EXIT is not a u8")?);
    }

    let test_keys = env_json("FAKE_PROBE_TEST_KEYS")?.unwrap_or_else(|| json!({}));
    let mut report = conforming_report(input.as_deref(), &tool, test_keys);
    if let Some(Value::Object(overrides)) = env_json("FAKE_PROBE_OVERRIDES")? {
        if let Some(top) = report.as_object_mut() {
            top.extend(overrides);
        }
    }

    match std::env::var("FAKE_PROBE_REPORT").as_deref() {
        Ok("missing") => {}
        Ok("garbage") => std::fs::write(&output, b"not json at all")?,
        Ok("array") => std::fs::write(&output, b"[]")?,
        _ => std::fs::write(&output, serde_json::to_vec(&report)?)?,
    }
    Ok(0)
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("fake-probe: {e:#}");
            ExitCode::from(2)
        }
    }
}
