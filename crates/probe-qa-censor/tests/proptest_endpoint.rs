//! Property-based tests for endpoint keys and spec encoding.
//!
//! Endpoint keys are compared as strings by the measurement tool, so the
//! textual form has to be stable for every address family and port.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use probe_qa_censor::{Endpoint, EndpointFault, InterferenceSpec, Transport};
use proptest::prelude::*;

fn ip_strategy() -> impl Strategy<Value = IpAddr> {
    prop_oneof![
        any::<u32>().prop_map(|v| IpAddr::V4(Ipv4Addr::from(v))),
        any::<u128>().prop_map(|v| IpAddr::V6(Ipv6Addr::from(v))),
    ]
}

fn transport_strategy() -> impl Strategy<Value = Transport> {
    prop_oneof![Just(Transport::Tcp), Just(Transport::Udp)]
}

fn endpoint_strategy() -> impl Strategy<Value = Endpoint> {
    (ip_strategy(), any::<u16>(), transport_strategy())
        .prop_map(|(ip, port, transport)| Endpoint::new(ip, port, transport))
}

proptest! {
    #[test]
    fn endpoint_text_form_is_parseable(ep in endpoint_strategy()) {
        let text = ep.to_string();
        let parsed: Endpoint = text.parse().unwrap();
        prop_assert_eq!(parsed, ep);
    }

    #[test]
    fn only_ipv6_is_bracketed(ep in endpoint_strategy()) {
        let text = ep.to_string();
        prop_assert_eq!(text.starts_with('['), ep.ip().is_ipv6());
        let suffix = format!(":{}/{}", ep.port(), ep.transport);
        prop_assert!(text.ends_with(&suffix));
    }

    #[test]
    fn insertion_order_does_not_change_the_bytes(
        rules in proptest::collection::btree_map(endpoint_strategy(), any::<bool>(), 0..8)
    ) {
        let fault = |drop: bool| {
            if drop { EndpointFault::DropData } else { EndpointFault::TcpRejectSyn }
        };

        let forward = InterferenceSpec::builder()
            .endpoints(rules.iter().map(|(ep, d)| (*ep, fault(*d))))
            .build();
        let reversed = InterferenceSpec::builder()
            .endpoints(rules.iter().rev().map(|(ep, d)| (*ep, fault(*d))))
            .build();

        prop_assert_eq!(forward.to_json_bytes().unwrap(), reversed.to_json_bytes().unwrap());
    }
}
