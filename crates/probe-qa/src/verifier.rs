//! Report verification.
//!
//! Every report first goes through the structural checks shared by all
//! experiments, then through the tool-specific [`Verification`]. Each check
//! is logged as `checking whether <what>... <bool>` and recorded in the
//! returned [`VerificationResult`]; nothing short-circuits, so a failing
//! report shows every problem at once.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{HarnessError, Result};
use crate::scenario::{ExpectedFields, Verification};

pub const DATA_FORMAT_VERSION: &str = "0.2.0";
/// The tool is always run with `-n`, which scrubs the probe address.
pub const SCRUBBED_PROBE_IP: &str = "127.0.0.1";

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}$")
        .expect("date pattern is valid")
});
static ASN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^AS[0-9]+$").expect("ASN pattern is valid"));
static CC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}$").expect("country code pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// What was checked, as logged after `checking whether`.
    pub description: String,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    /// Structural and semantic checks both passed.
    pub passed: bool,
    /// Every check in the order it ran.
    pub checks: Vec<CheckOutcome>,
}

impl VerificationResult {
    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// Accumulates logged check outcomes.
#[derive(Debug, Default)]
pub struct Checklist {
    checks: Vec<CheckOutcome>,
}

impl Checklist {
    /// Logs and records one check, returning `passed`.
    pub fn record(&mut self, description: impl Into<String>, passed: bool) -> bool {
        let description = description.into();
        tracing::info!("checking whether {description}... {passed}");
        self.checks.push(CheckOutcome {
            description,
            passed,
        });
        passed
    }

    fn finish(self, passed: bool) -> VerificationResult {
        VerificationResult {
            passed,
            checks: self.checks,
        }
    }
}

/// A named custom check over `test_keys`.
pub type Predicate = fn(&mut Checklist, &Map<String, Value>) -> bool;

const PREDICATES: &[(&str, Predicate)] = &[
    ("body_proportion_below_one", body_proportion_below_one),
    (
        "requests_and_tcp_connect_nonempty",
        requests_and_tcp_connect_nonempty,
    ),
];

pub fn lookup_predicate(name: &str) -> Option<Predicate> {
    PREDICATES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, predicate)| *predicate)
}

pub fn predicate_names() -> impl Iterator<Item = &'static str> {
    PREDICATES.iter().map(|(n, _)| *n)
}

/// Checks `report` for a run of `tool` on `input` (`None` expects a null
/// input).
///
/// `scenario` is only used to attribute errors. Fails only when the
/// verification names an unregistered predicate; a non-conforming report is
/// an `Ok` result with `passed == false`.
pub fn verify(
    scenario: &str,
    input: Option<&str>,
    tool: &str,
    verification: &Verification,
    report: &Value,
) -> Result<VerificationResult> {
    let mut list = Checklist::default();
    let structural = check_structure(&mut list, report, input, tool);
    let semantic = match report.get("test_keys").and_then(Value::as_object) {
        Some(test_keys) => check_semantics(&mut list, scenario, verification, test_keys)?,
        None => false,
    };
    Ok(list.finish(structural && semantic))
}

fn check_structure(
    list: &mut Checklist,
    report: &Value,
    input: Option<&str>,
    tool: &str,
) -> bool {
    let mut ok = true;
    ok &= check_annotations(list, report);
    ok &= list.record(
        "we have the right data format version",
        report.get("data_format_version").and_then(Value::as_str) == Some(DATA_FORMAT_VERSION),
    );
    // Some experiments omit extensions, so this never fails.
    list.record(
        "report.extensions is an object",
        report.get("extensions").is_some_and(Value::is_object),
    );
    let input_ok = match input {
        Some(input) => report.get("input").and_then(Value::as_str) == Some(input),
        None => report.get("input").is_some_and(Value::is_null),
    };
    ok &= list.record("input is correct", input_ok);
    ok &= check_pattern(list, report, "measurement_start_time", &DATE_RE, "date");
    ok &= check_pattern(list, report, "probe_asn", &ASN_RE, "ASN");
    ok &= check_pattern(list, report, "probe_cc", &CC_RE, "CC");
    ok &= list.record(
        "probe_ip is correct",
        report.get("probe_ip").and_then(Value::as_str) == Some(SCRUBBED_PROBE_IP),
    );
    ok &= check_string(list, report, "probe_network_name");
    ok &= list.record(
        "report_id is correct",
        report.get("report_id").and_then(Value::as_str) == Some(""),
    );
    ok &= check_pattern(list, report, "resolver_asn", &ASN_RE, "ASN");
    ok &= check_string(list, report, "resolver_ip");
    ok &= check_string(list, report, "resolver_network_name");
    ok &= check_string(list, report, "software_name");
    ok &= check_string(list, report, "software_version");
    ok &= list.record(
        "the experiment name is correct",
        report.get("test_name").and_then(Value::as_str) == Some(tool),
    );
    ok &= list.record(
        "test_runtime is a number",
        report.get("test_runtime").is_some_and(Value::is_number),
    );
    ok &= check_pattern(list, report, "test_start_time", &DATE_RE, "date");
    ok &= check_string(list, report, "test_version");
    ok &= list.record(
        "test_keys is an object",
        report.get("test_keys").is_some_and(Value::is_object),
    );
    ok
}

fn check_annotations(list: &mut Checklist, report: &Value) -> bool {
    let annotations = report.get("annotations").and_then(Value::as_object);
    let mut ok = list.record("annotations is an object", annotations.is_some());
    for key in ["architecture", "engine_name", "engine_version", "platform"] {
        let present = annotations
            .and_then(|a| a.get(key))
            .is_some_and(Value::is_string);
        ok &= list.record(format!("annotations contains {key}"), present);
    }
    ok
}

fn check_string(list: &mut Checklist, report: &Value, key: &str) -> bool {
    list.record(
        format!("{key} is a string"),
        report.get(key).is_some_and(Value::is_string),
    )
}

fn check_pattern(list: &mut Checklist, report: &Value, key: &str, re: &Regex, what: &str) -> bool {
    let value = report.get(key).and_then(Value::as_str);
    list.record(format!("{key} is a string"), value.is_some());
    list.record(
        format!("{key} matches the {what} regexp"),
        value.is_some_and(|v| re.is_match(v)),
    )
}

fn check_semantics(
    list: &mut Checklist,
    scenario: &str,
    verification: &Verification,
    test_keys: &Map<String, Value>,
) -> Result<bool> {
    match verification {
        Verification::Structural => Ok(true),
        Verification::Fields { expect } => Ok(check_fields(list, expect, test_keys)),
        Verification::Predicate { name } => {
            let predicate = lookup_predicate(name).ok_or_else(|| HarnessError::UnknownPredicate {
                scenario: scenario.to_string(),
                name: name.clone(),
            })?;
            Ok(predicate(list, test_keys))
        }
        Verification::All { of } => {
            let mut ok = true;
            for nested in of {
                ok &= check_semantics(list, scenario, nested, test_keys)?;
            }
            Ok(ok)
        }
    }
}

fn check_fields(list: &mut Checklist, expect: &ExpectedFields, test_keys: &Map<String, Value>) -> bool {
    let mut ok = true;
    for (key, expected) in expect {
        let matches = test_keys
            .get(key)
            .is_some_and(|actual| json_equal(actual, expected));
        ok &= list.record(format!("{key}'s value is {expected}"), matches);
    }
    ok
}

/// Structural equality where numbers compare by value, so `0` equals `0.0`.
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (integer(x), integer(y)) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Integers compare exactly; only floats go through `f64`.
fn integer(n: &serde_json::Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn body_proportion_below_one(list: &mut Checklist, test_keys: &Map<String, Value>) -> bool {
    let proportion = test_keys.get("body_proportion").and_then(Value::as_f64);
    list.record(
        "body_proportion is below one",
        proportion.is_some_and(|p| p < 1.0),
    )
}

fn requests_and_tcp_connect_nonempty(list: &mut Checklist, test_keys: &Map<String, Value>) -> bool {
    let nonempty = |key: &str| {
        test_keys
            .get(key)
            .and_then(Value::as_array)
            .filter(|entries| !entries.is_empty())
    };

    let mut ok = true;
    let requests = nonempty("requests");
    ok &= list.record("requests is a non-empty list", requests.is_some());
    if let Some(requests) = requests {
        let well_formed = requests.iter().all(|entry| {
            entry.get("request").is_some_and(Value::is_object)
                && entry.get("response").is_some_and(Value::is_object)
                && entry
                    .get("failure")
                    .is_some_and(|f| f.is_string() || f.is_null())
        });
        ok &= list.record("every request has request and response objects", well_formed);
    }

    let connects = nonempty("tcp_connect");
    ok &= list.record("tcp_connect is a non-empty list", connects.is_some());
    if let Some(connects) = connects {
        let well_formed = connects.iter().all(|entry| {
            entry.get("ip").is_some_and(Value::is_string)
                && entry.get("port").is_some_and(Value::is_u64)
                && entry
                    .get("status")
                    .and_then(|s| s.get("success"))
                    .is_some_and(Value::is_boolean)
        });
        ok &= list.record("every tcp_connect entry has ip, port and success", well_formed);
    }
    ok
}
