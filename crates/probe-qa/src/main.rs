//! probe-qa
//!
//! Runs the measurement tool's web experiments under simulated censorship
//! and checks the reports against known-good expectations.
//!
//! - `probe-qa list` shows the scenarios
//! - `probe-qa run [NAME...]` runs all or some of them
//! - `probe-qa show NAME` prints a scenario's interference spec

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use probe_qa::{driver, Catalog, QaConfig, Runner, SubprocessProbe};
use tracing_subscriber::EnvFilter;

/// QA harness for the measurement tool.
#[derive(Parser, Debug)]
#[command(name = "probe-qa", about = "Run the measurement tool under simulated censorship")]
struct Cli {
    /// Config file (default: ./probe-qa.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Measurement tool binary.
    #[arg(long, global = true)]
    probe: Option<PathBuf>,

    /// Directory for temporary spec and report files.
    #[arg(long, global = true)]
    workdir: Option<PathBuf>,

    /// JSON scenario catalog replacing the built-in one.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Skip the configured build command.
    #[arg(long, global = true, default_value_t = false)]
    no_build: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available scenarios.
    List,
    /// Run all scenarios, or only the named ones in the given order.
    Run {
        /// Scenario names.
        names: Vec<String>,
    },
    /// Print the interference spec of a scenario.
    Show {
        /// Scenario name.
        name: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(std::io::stdout().is_terminal())
        .compact()
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            tracing::error!("some checks failed (see above logs)");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(true);
    };

    let mut config = QaConfig::discover(cli.config.as_deref())?;
    if let Some(probe) = cli.probe {
        config.probe.binary = probe;
    }
    if let Some(workdir) = cli.workdir {
        config.workdir = workdir;
    }
    if let Some(catalog) = cli.catalog {
        config.catalog = Some(catalog);
    }

    let catalog = match &config.catalog {
        Some(path) => Catalog::from_json_file(path)?,
        None => Catalog::builtin()?,
    };

    match command {
        Command::List => {
            for (name, description) in catalog.list() {
                println!("{name}:");
                println!("\t{description}");
            }
            Ok(true)
        }
        Command::Show { name } => {
            let scenario = catalog
                .get(&name)
                .ok_or_else(|| probe_qa::HarnessError::UnknownScenario(name.clone()))?;
            let spec = scenario
                .interference
                .to_json_pretty()
                .context("encoding interference spec")?;
            println!("{spec}");
            Ok(true)
        }
        Command::Run { names } => {
            if let Some(unknown) = names.iter().find(|name| catalog.get(name).is_none()) {
                return Err(probe_qa::HarnessError::UnknownScenario(unknown.clone()).into());
            }
            if let Some(build) = config.probe.build.as_ref().filter(|_| !cli.no_build) {
                driver::run_build(build)?;
            }

            let probe = SubprocessProbe::from_config(&config);
            let count = if names.is_empty() { catalog.len() } else { names.len() };
            tracing::info!(
                probe = %probe.binary().display(),
                workdir = %probe.workdir().display(),
                scenarios = count,
                "probe-qa starting"
            );

            let runner = Runner::new(&catalog, probe);
            let summary = if names.is_empty() {
                runner.run_all()?
            } else {
                runner.run_selected(&names)?
            };

            for failed in summary.failures() {
                for check in failed.result.failures() {
                    tracing::warn!(
                        "{}.{}: {} failed",
                        failed.scenario,
                        failed.tool,
                        check.description
                    );
                }
            }
            Ok(summary.passed())
        }
    }
}
