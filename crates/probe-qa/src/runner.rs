//! Sequential execution of scenarios.
//!
//! Every (scenario, tool) pair runs even after a failed check, so a single
//! run reports every regression. Errors from the probe or the verifier stop
//! the run immediately.

use crate::catalog::Catalog;
use crate::driver::Probe;
use crate::error::{HarnessError, Result};
use crate::scenario::Scenario;
use crate::verifier::{self, VerificationResult};

/// The verdict for one (scenario, tool) pair.
#[derive(Debug, Clone)]
pub struct PairOutcome {
    /// Scenario name.
    pub scenario: String,
    /// Experiment the tool ran.
    pub tool: String,
    /// Every check run against the report.
    pub result: VerificationResult,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// One entry per pair, in run order.
    pub outcomes: Vec<PairOutcome>,
}

impl RunSummary {
    /// True when every pair passed; vacuously true for an empty run.
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.passed)
    }

    pub fn pass_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.passed).count()
    }

    pub fn fail_count(&self) -> usize {
        self.outcomes.len() - self.pass_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PairOutcome> {
        self.outcomes.iter().filter(|o| !o.result.passed)
    }
}

pub struct Runner<'a, P> {
    catalog: &'a Catalog,
    probe: P,
}

impl<'a, P: Probe> Runner<'a, P> {
    pub fn new(catalog: &'a Catalog, probe: P) -> Self {
        Self { catalog, probe }
    }

    pub fn run_all(&self) -> Result<RunSummary> {
        let scenarios: Vec<&Scenario> = self.catalog.scenarios().iter().collect();
        self.run_scenarios(&scenarios)
    }

    /// Runs `names` in the given order. Every name is resolved before
    /// anything runs.
    pub fn run_selected<S: AsRef<str>>(&self, names: &[S]) -> Result<RunSummary> {
        let scenarios = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.catalog
                    .get(name)
                    .ok_or_else(|| HarnessError::UnknownScenario(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.run_scenarios(&scenarios)
    }

    fn run_scenarios(&self, scenarios: &[&Scenario]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for scenario in scenarios {
            self.run_scenario(scenario, &mut summary)?;
        }
        tracing::info!(
            passed = summary.pass_count(),
            failed = summary.fail_count(),
            "run complete"
        );
        Ok(summary)
    }

    fn run_scenario(&self, scenario: &Scenario, summary: &mut RunSummary) -> Result<()> {
        tracing::info!("# running: {}", scenario.name);
        for check in &scenario.checks {
            tracing::info!("## running: {}.{}", scenario.name, check.tool);
            let report = self.probe.measure(scenario, &check.tool)?;
            let result = verifier::verify(
                &scenario.name,
                scenario.input.as_deref(),
                &check.tool,
                &check.verify,
                &report,
            )?;
            if result.passed {
                tracing::info!("## {}.{}: pass", scenario.name, check.tool);
            } else {
                tracing::warn!("## {}.{}: FAIL", scenario.name, check.tool);
            }
            summary.outcomes.push(PairOutcome {
                scenario: scenario.name.clone(),
                tool: check.tool.clone(),
                result,
            });
        }
        Ok(())
    }
}
