//! # Built-in Web Scenarios
//!
//! Censorship cases for the web experiments, grouped by the step that fails:
//! - **DNS**: only the system resolver misbehaves
//! - **TCP connect**: SYNs dropped or rejected
//! - **TLS / QUIC handshake**: stalled or reset handshakes
//! - **Cleartext HTTP**: reset, timeout and 451 block pages
//! - **Multiple addresses**: the failing address first or second in the answer
//!
//! `websteps` only gets the structural checks. `web_connectivity` is
//! checked against the exact top-level keys it produced when each case was
//! last validated, including values known to be wrong so a fix shows up as
//! a diff.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use probe_qa_censor::{DnsFault, Endpoint, EndpointFault, HttpFault, InterferenceSpec, TlsFault};
use serde_json::{json, Value};

use crate::scenario::{Scenario, Verification};

pub const WEBSTEPS: &str = "websteps";
pub const WEB_CONNECTIVITY: &str = "web_connectivity";

const NEXA_HTTPS: &str = "https://nexa.polito.it/";
const NEXA_HTTP: &str = "http://nexa.polito.it/";
const NEXA_DOMAIN: &str = "nexa.polito.it";
const NEXA_IP: Ipv4Addr = Ipv4Addr::new(130, 192, 16, 171);

const GOOGLE_HTTPS: &str = "https://dns.google/";
const GOOGLE_DOMAIN: &str = "dns.google";
const GOOGLE_A: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);
const GOOGLE_B: Ipv4Addr = Ipv4Addr::new(8, 8, 4, 4);

/// Keys shared by every case where no HTTP response was received.
fn no_http_response(
    dns_experiment_failure: Value,
    dns_consistency: &str,
    http_experiment_failure: Option<Value>,
    accessible: Value,
    blocking: Value,
) -> Verification {
    let mut fields = vec![
        ("dns_experiment_failure", dns_experiment_failure),
        ("dns_consistency", json!(dns_consistency)),
        ("control_failure", Value::Null),
    ];
    if let Some(failure) = http_experiment_failure {
        fields.push(("http_experiment_failure", failure));
    }
    fields.extend([
        ("body_length_match", Value::Null),
        ("body_proportion", json!(0)),
        ("status_code_match", Value::Null),
        ("headers_match", Value::Null),
        ("title_match", Value::Null),
        ("accessible", accessible),
        ("blocking", blocking),
    ]);
    Verification::fields(fields)
}

/// A case where DNS worked and a later step failed with `failure`.
fn later_step_failed(failure: &str, blocking: &str) -> Verification {
    no_http_response(
        Value::Null,
        "consistent",
        Some(json!(failure)),
        json!(false),
        json!(blocking),
    )
}

fn web(name: &str, description: &str, input: &str, spec: InterferenceSpec) -> Scenario {
    Scenario::new(name, description, input, spec).check(WEBSTEPS, Verification::Structural)
}

fn dns_scenarios() -> Vec<Scenario> {
    let only_system = |fault| InterferenceSpec::builder().domain(NEXA_DOMAIN, fault).build();

    vec![
        web(
            "web_dns_system_nxdomain",
            "the system resolver returns NXDOMAIN",
            NEXA_HTTPS,
            only_system(DnsFault::Nxdomain),
        )
        .check(
            WEB_CONNECTIVITY,
            no_http_response(
                json!("dns_nxdomain_error"),
                "inconsistent",
                None,
                json!(false),
                json!("dns"),
            ),
        ),
        // accessible and blocking should not be null here.
        web(
            "web_dns_system_refused",
            "the system resolver returns REFUSED",
            NEXA_HTTPS,
            only_system(DnsFault::Refused),
        )
        .check(
            WEB_CONNECTIVITY,
            no_http_response(
                json!("dns_refused_error"),
                "inconsistent",
                None,
                Value::Null,
                Value::Null,
            ),
        ),
        // web_connectivity mishandles this case but still reports "dns".
        web(
            "web_dns_system_localhost",
            "the system resolver returns localhost",
            NEXA_HTTPS,
            only_system(DnsFault::Localhost),
        )
        .check(
            WEB_CONNECTIVITY,
            no_http_response(
                Value::Null,
                "inconsistent",
                Some(json!("connection_refused")),
                json!(false),
                json!("dns"),
            ),
        ),
        // Same as localhost.
        web(
            "web_dns_system_bogon_not_localhost",
            "the system resolver returns a bogon that is not localhost",
            NEXA_HTTPS,
            InterferenceSpec::builder()
                .dns_cache(NEXA_DOMAIN, [IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))])
                .domain(NEXA_DOMAIN, DnsFault::Cache)
                .build(),
        )
        .check(
            WEB_CONNECTIVITY,
            no_http_response(
                Value::Null,
                "inconsistent",
                Some(json!("generic_timeout_error")),
                json!(false),
                json!("dns"),
            ),
        ),
        // accessible and blocking should not be null here.
        web(
            "web_dns_system_no_answer",
            "the system resolver returns an empty answer",
            NEXA_HTTPS,
            only_system(DnsFault::NoAnswer),
        )
        .check(
            WEB_CONNECTIVITY,
            no_http_response(
                json!("dns_no_answer"),
                "inconsistent",
                Some(Value::Null),
                Value::Null,
                Value::Null,
            ),
        ),
        // accessible and blocking should not be null here.
        web(
            "web_dns_system_timeout",
            "the system resolver times out",
            NEXA_HTTPS,
            only_system(DnsFault::Timeout),
        )
        .check(
            WEB_CONNECTIVITY,
            no_http_response(
                json!("generic_timeout_error"),
                "inconsistent",
                Some(Value::Null),
                Value::Null,
                Value::Null,
            ),
        ),
    ]
}

fn tcp_tls_quic_scenarios() -> Vec<Scenario> {
    let nexa_443 = |fault| {
        InterferenceSpec::builder()
            .endpoint(Endpoint::tcp(NEXA_IP, 443), fault)
            .build()
    };

    let google_quic = [
        IpAddr::V4(GOOGLE_A),
        IpAddr::V4(GOOGLE_B),
        IpAddr::V6(Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888)),
        IpAddr::V6(Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8844)),
    ]
    .map(|ip| (Endpoint::udp(ip, 443), EndpointFault::DropData));

    vec![
        web(
            "web_tcp_connect_timeout",
            "timeout when connecting to the IP address",
            NEXA_HTTPS,
            nexa_443(EndpointFault::TcpDropSyn),
        )
        .check(
            WEB_CONNECTIVITY,
            later_step_failed("generic_timeout_error", "tcp_ip"),
        ),
        web(
            "web_tcp_connect_refused",
            "connection refused when connecting to the IP address",
            NEXA_HTTPS,
            nexa_443(EndpointFault::TcpRejectSyn),
        )
        .check(
            WEB_CONNECTIVITY,
            later_step_failed("connection_refused", "tcp_ip"),
        ),
        web(
            "web_tls_handshake_timeout",
            "timeout when performing the TLS handshake",
            NEXA_HTTPS,
            nexa_443(EndpointFault::DropData),
        )
        .check(
            WEB_CONNECTIVITY,
            later_step_failed("generic_timeout_error", "http-failure"),
        ),
        web(
            "web_tls_handshake_reset",
            "reset when performing the TLS handshake",
            NEXA_HTTPS,
            InterferenceSpec::builder()
                .endpoint(Endpoint::tcp(NEXA_IP, 443), EndpointFault::HijackTls)
                .sni(NEXA_DOMAIN, TlsFault::Reset)
                .build(),
        )
        .check(
            WEB_CONNECTIVITY,
            later_step_failed("connection_reset", "http-failure"),
        ),
        web(
            "web_quic_handshake_timeout",
            "timeout when performing the QUIC handshake",
            GOOGLE_HTTPS,
            InterferenceSpec::builder().endpoints(google_quic).build(),
        ),
    ]
}

fn http_scenarios() -> Vec<Scenario> {
    let nexa_80 = |fault| {
        InterferenceSpec::builder()
            .endpoint(Endpoint::tcp(NEXA_IP, 80), EndpointFault::HijackHttp)
            .host(NEXA_DOMAIN, fault)
            .build()
    };

    vec![
        web(
            "web_http_reset",
            "reset when performing the HTTP round trip",
            NEXA_HTTP,
            nexa_80(HttpFault::Reset),
        )
        .check(
            WEB_CONNECTIVITY,
            later_step_failed("connection_reset", "http-failure"),
        ),
        web(
            "web_http_timeout",
            "timeout when performing the HTTP round trip",
            NEXA_HTTP,
            nexa_80(HttpFault::Timeout),
        )
        .check(
            WEB_CONNECTIVITY,
            later_step_failed("generic_timeout_error", "http-failure"),
        ),
        // body_proportion is a float that depends on the real page, so it
        // is left out.
        web(
            "web_http_451",
            "451 when performing the HTTP round trip",
            NEXA_HTTP,
            nexa_80(HttpFault::Status451),
        )
        .check(
            WEB_CONNECTIVITY,
            Verification::fields([
                ("dns_experiment_failure", Value::Null),
                ("dns_consistency", json!("consistent")),
                ("control_failure", Value::Null),
                ("http_experiment_failure", Value::Null),
                ("body_length_match", json!(false)),
                ("status_code_match", json!(false)),
                ("headers_match", json!(false)),
                ("title_match", json!(false)),
                ("accessible", json!(false)),
                ("blocking", json!("http-diff")),
            ]),
        ),
    ]
}

fn multi_address_scenarios() -> Vec<Scenario> {
    // The resolver answers 8.8.4.4 first, then 8.8.8.8.
    let reset_one = |bad: Ipv4Addr| {
        InterferenceSpec::builder()
            .dns_cache(GOOGLE_DOMAIN, [IpAddr::V4(GOOGLE_B), IpAddr::V4(GOOGLE_A)])
            .domain(GOOGLE_DOMAIN, DnsFault::Cache)
            .endpoint(Endpoint::tcp(bad, 443), EndpointFault::HijackTls)
            .sni(GOOGLE_DOMAIN, TlsFault::Reset)
            .build()
    };

    vec![
        // web_connectivity only uses the first address, which works.
        web(
            "web_tcp_second_ip_connection_reset",
            "the second IP returned by DNS fails with connection reset",
            GOOGLE_HTTPS,
            reset_one(GOOGLE_A),
        )
        .check(
            WEB_CONNECTIVITY,
            Verification::fields([
                ("dns_experiment_failure", Value::Null),
                ("dns_consistency", json!("consistent")),
                ("control_failure", Value::Null),
                ("http_experiment_failure", Value::Null),
                ("body_length_match", json!(true)),
                ("body_proportion", json!(1)),
                ("status_code_match", json!(true)),
                ("headers_match", json!(true)),
                ("title_match", json!(true)),
                ("accessible", json!(true)),
                ("blocking", json!(false)),
            ]),
        ),
        web(
            "web_tcp_first_ip_connection_reset",
            "the first IP returned by DNS fails with connection reset",
            GOOGLE_HTTPS,
            reset_one(GOOGLE_B),
        )
        .check(
            WEB_CONNECTIVITY,
            later_step_failed("connection_reset", "http-failure"),
        ),
    ]
}

/// All built-in scenarios, in run order.
pub fn web_scenarios() -> Vec<Scenario> {
    let mut all = dns_scenarios();
    all.extend(tcp_tls_quic_scenarios());
    all.extend(http_scenarios());
    all.extend(multi_address_scenarios());
    all
}
