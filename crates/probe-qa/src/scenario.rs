//! Scenario definitions.
//!
//! A [`Scenario`] pairs one input URL and one [`InterferenceSpec`] with the
//! tools to run against them. Each tool carries its own [`Verification`]:
//! a table of expected `test_keys` values, a named predicate, or nothing
//! beyond the structural checks every report gets.

use probe_qa_censor::InterferenceSpec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Expected `test_keys` fields, in the order they are checked.
pub type ExpectedFields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    /// `None` for experiments that take no input; the report then carries
    /// `"input": null`.
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub interference: InterferenceSpec,
    pub checks: Vec<ToolCheck>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCheck {
    pub tool: String,
    #[serde(default)]
    pub verify: Verification,
}

/// What to assert about `test_keys` once the structural checks ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verification {
    /// Structural checks only.
    #[default]
    Structural,
    /// Each key must be present with an equal value.
    Fields { expect: ExpectedFields },
    /// A named check from the predicate registry.
    Predicate { name: String },
    /// Every nested verification must pass.
    All { of: Vec<Verification> },
}

impl Verification {
    /// Builds a [`Verification::Fields`] keeping the given order.
    pub fn fields<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Verification::Fields {
            expect: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    pub fn predicate(name: impl Into<String>) -> Self {
        Verification::Predicate { name: name.into() }
    }

    /// Predicate names referenced anywhere in this verification.
    pub fn predicate_names(&self) -> Vec<&str> {
        match self {
            Verification::Structural | Verification::Fields { .. } => Vec::new(),
            Verification::Predicate { name } => vec![name.as_str()],
            Verification::All { of } => of.iter().flat_map(|v| v.predicate_names()).collect(),
        }
    }
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input: impl Into<String>,
        interference: InterferenceSpec,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input: Some(input.into()),
            interference,
            checks: Vec::new(),
        }
    }

    pub fn inputless(
        name: impl Into<String>,
        description: impl Into<String>,
        interference: InterferenceSpec,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input: None,
            interference,
            checks: Vec::new(),
        }
    }

    /// Appends a tool to run; tools run in the order they were added.
    pub fn check(mut self, tool: impl Into<String>, verify: Verification) -> Self {
        self.checks.push(ToolCheck {
            tool: tool.into(),
            verify,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_qa_censor::DnsFault;
    use serde_json::json;

    #[test]
    fn fields_keep_declaration_order() {
        let v = Verification::fields([
            ("dns_experiment_failure", json!(null)),
            ("accessible", json!(false)),
            ("blocking", json!("dns")),
        ]);
        let Verification::Fields { expect } = v else {
            panic!("expected a field table");
        };
        let keys: Vec<_> = expect.keys().map(String::as_str).collect();
        assert_eq!(keys, ["dns_experiment_failure", "accessible", "blocking"]);
    }

    #[test]
    fn verification_json_form() {
        let v = Verification::All {
            of: vec![
                Verification::fields([("blocking", json!("http-diff"))]),
                Verification::predicate("body_proportion_below_one"),
            ],
        };
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!({
                "kind": "all",
                "of": [
                    {"kind": "fields", "expect": {"blocking": "http-diff"}},
                    {"kind": "predicate", "name": "body_proportion_below_one"},
                ]
            })
        );
        assert_eq!(v.predicate_names(), ["body_proportion_below_one"]);
    }

    #[test]
    fn scenario_from_json_defaults_to_structural() {
        let scenario: Scenario = serde_json::from_value(json!({
            "name": "dns_nx",
            "description": "nxdomain",
            "input": "https://example.org/",
            "interference": {"Domains": {"example.org": "nxdomain"}},
            "checks": [{"tool": "websteps"}],
        }))
        .unwrap();

        assert_eq!(scenario.checks[0].verify, Verification::Structural);
        assert_eq!(scenario.input.as_deref(), Some("https://example.org/"));
        assert_eq!(
            scenario.interference.domains.get("example.org"),
            Some(&DnsFault::Nxdomain)
        );
    }

    #[test]
    fn inputless_scenarios_have_null_input() {
        let s = Scenario::inputless("wa", "whatsapp", InterferenceSpec::default())
            .check("whatsapp", Verification::predicate("requests_and_tcp_connect_nonempty"));
        let value = serde_json::to_value(&s).unwrap();
        assert_eq!(value["input"], serde_json::Value::Null);
        let back: Scenario = serde_json::from_value(value).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn builder_appends_tools_in_order() {
        let s = Scenario::new("a", "b", "https://example.org/", InterferenceSpec::default())
            .check("websteps", Verification::Structural)
            .check("web_connectivity", Verification::predicate("x"));
        let tools: Vec<_> = s.checks.iter().map(|c| c.tool.as_str()).collect();
        assert_eq!(tools, ["websteps", "web_connectivity"]);
    }
}
