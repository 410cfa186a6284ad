//! Test helpers shared by unit tests, integration tests and `fake-probe`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;

use serde_json::{json, Value};

use crate::driver::Probe;
use crate::error::{HarnessError, Result};
use crate::scenario::Scenario;

/// A report that passes every structural check for `tool` on `input`.
pub fn conforming_report<'a>(
    input: impl Into<Option<&'a str>>,
    tool: &str,
    test_keys: Value,
) -> Value {
    let input = input.into();
    json!({
        "annotations": {
            "architecture": "amd64",
            "engine_name": "ooniprobe-engine",
            "engine_version": "0.1.0",
            "platform": "linux",
        },
        "data_format_version": "0.2.0",
        "extensions": {},
        "input": input,
        "measurement_start_time": "2021-03-04 11:22:33",
        "probe_asn": "AS30722",
        "probe_cc": "IT",
        "probe_ip": "127.0.0.1",
        "probe_network_name": "Vodafone Italia S.p.A.",
        "report_id": "",
        "resolver_asn": "AS15169",
        "resolver_ip": "8.8.8.8",
        "resolver_network_name": "Google LLC",
        "software_name": "miniooni",
        "software_version": "0.1.0",
        "test_keys": test_keys,
        "test_name": tool,
        "test_runtime": 1.25,
        "test_start_time": "2021-03-04 11:22:30",
        "test_version": "0.4.0",
    })
}

/// In-process [`Probe`] returning canned reports keyed by
/// `(scenario, tool)`, and recording every call.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    reports: HashMap<(String, String), Value>,
    calls: RefCell<Vec<(String, String)>>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(mut self, scenario: &str, tool: &str, report: Value) -> Self {
        self.reports
            .insert((scenario.to_string(), tool.to_string()), report);
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.borrow().clone()
    }
}

impl Probe for ScriptedProbe {
    fn measure(&self, scenario: &Scenario, tool: &str) -> Result<Value> {
        let key = (scenario.name.clone(), tool.to_string());
        self.calls.borrow_mut().push(key.clone());
        self.reports
            .get(&key)
            .cloned()
            .ok_or_else(|| HarnessError::ReportRead {
                path: format!("{}.{}.json", key.0, key.1).into(),
                source: io::Error::new(io::ErrorKind::NotFound, "no scripted report"),
            })
    }
}
