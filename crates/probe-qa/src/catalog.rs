//! The named, ordered set of scenarios a run draws from.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{HarnessError, Result};
use crate::scenario::Scenario;
use crate::verifier;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    scenarios: Vec<Scenario>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    /// Validates and indexes `scenarios`, keeping their order.
    ///
    /// Rejects duplicate names, scenarios without any tool to run, and
    /// predicate names missing from the registry.
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(scenarios.len());
        for (idx, scenario) in scenarios.iter().enumerate() {
            if by_name.insert(scenario.name.clone(), idx).is_some() {
                return Err(HarnessError::DuplicateScenario(scenario.name.clone()));
            }
            if scenario.checks.is_empty() {
                return Err(HarnessError::EmptyChecks(scenario.name.clone()));
            }
            for check in &scenario.checks {
                for name in check.verify.predicate_names() {
                    if verifier::lookup_predicate(name).is_none() {
                        return Err(HarnessError::UnknownPredicate {
                            scenario: scenario.name.clone(),
                            name: name.to_string(),
                        });
                    }
                }
            }
        }
        Ok(Self { scenarios, by_name })
    }

    /// The scenarios shipped with the harness.
    pub fn builtin() -> Result<Self> {
        Self::new(crate::web::web_scenarios())
    }

    /// Parses a JSON array of scenarios.
    pub fn from_json_str(input: &str) -> Result<Self> {
        Self::parse(input, Path::new("<inline>"))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| HarnessError::Catalog {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self> {
        let scenarios: Vec<Scenario> =
            serde_json::from_str(text).map_err(|e| HarnessError::Catalog {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::new(scenarios)
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.by_name.get(name).map(|&idx| &self.scenarios[idx])
    }

    /// `(name, description)` pairs in catalog order.
    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.scenarios
            .iter()
            .map(|s| (s.name.as_str(), s.description.as_str()))
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Verification;
    use probe_qa_censor::InterferenceSpec;

    fn scenario(name: &str) -> Scenario {
        Scenario::new(name, "desc", "https://example.org/", InterferenceSpec::default())
            .check("websteps", Verification::Structural)
    }

    #[test]
    fn keeps_order_and_indexes_by_name() {
        let catalog = Catalog::new(vec![scenario("b"), scenario("a")]).unwrap();
        let names: Vec<_> = catalog.list().map(|(n, _)| n).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(catalog.get("a").unwrap().name, "a");
        assert!(catalog.get("c").is_none());
    }

    #[test]
    fn rejects_duplicates() {
        let err = Catalog::new(vec![scenario("a"), scenario("a")]).unwrap_err();
        assert!(matches!(err, HarnessError::DuplicateScenario(n) if n == "a"));
    }

    #[test]
    fn rejects_scenarios_without_tools() {
        let empty = Scenario::new("a", "d", "https://example.org/", InterferenceSpec::default());
        let err = Catalog::new(vec![empty]).unwrap_err();
        assert!(matches!(err, HarnessError::EmptyChecks(n) if n == "a"));
    }

    #[test]
    fn rejects_unknown_predicates() {
        let bad = scenario("a").check("whatsapp", Verification::predicate("no_such_check"));
        let err = Catalog::new(vec![bad]).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::UnknownPredicate { ref name, .. } if name == "no_such_check"
        ));
    }

    #[test]
    fn empty_catalog_is_valid() {
        let catalog = Catalog::new(Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.list().count(), 0);
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 16);
        let (first, desc) = catalog.list().next().unwrap();
        assert_eq!(first, "web_dns_system_nxdomain");
        assert_eq!(desc, "the system resolver returns NXDOMAIN");
    }

    #[test]
    fn parse_json_catalog() {
        let json = r#"[
            {
                "name": "whatsapp_plain",
                "description": "no interference",
                "checks": [
                    {"tool": "whatsapp", "verify": {"kind": "predicate", "name": "requests_and_tcp_connect_nonempty"}}
                ]
            }
        ]"#;
        let catalog = Catalog::from_json_str(json).unwrap();
        let scenario = catalog.get("whatsapp_plain").unwrap();
        assert!(scenario.interference.is_empty());
        assert!(scenario.input.is_none());

        let err = Catalog::from_json_str("{}").unwrap_err();
        assert!(matches!(err, HarnessError::Catalog { .. }));
    }
}
