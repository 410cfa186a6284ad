use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;
use crate::fault::{DnsFault, EndpointFault, HttpFault, TlsFault};

/// A complete censorship-simulation document.
///
/// Serializes to the JSON object read by the measurement tool's `--censor`
/// flag. The key casing (`Domains`, `SNIs`, `DNSCache`, ...) is fixed by
/// the tool. Empty categories are omitted and every map is sorted, so the
/// same rules always produce the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterferenceSpec {
    #[serde(rename = "Domains", skip_serializing_if = "BTreeMap::is_empty")]
    pub domains: BTreeMap<String, DnsFault>,
    #[serde(rename = "Endpoints", skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoints: BTreeMap<Endpoint, EndpointFault>,
    #[serde(rename = "SNIs", skip_serializing_if = "BTreeMap::is_empty")]
    pub snis: BTreeMap<String, TlsFault>,
    #[serde(rename = "Hosts", skip_serializing_if = "BTreeMap::is_empty")]
    pub hosts: BTreeMap<String, HttpFault>,
    #[serde(rename = "Divert", skip_serializing_if = "BTreeMap::is_empty")]
    pub divert: BTreeMap<Endpoint, Endpoint>,
    /// Answers for `cache` domains, in the order the resolver returns them.
    #[serde(rename = "DNSCache", skip_serializing_if = "BTreeMap::is_empty")]
    pub dns_cache: BTreeMap<String, Vec<IpAddr>>,
}

impl InterferenceSpec {
    pub fn builder() -> InterferenceBuilder {
        InterferenceBuilder::default()
    }

    /// True when the spec contains no rules at all (an uncensored run).
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
            && self.endpoints.is_empty()
            && self.snis.is_empty()
            && self.hosts.is_empty()
            && self.divert.is_empty()
            && self.dns_cache.is_empty()
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_slice(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }

    /// Report follow-up rules that cannot take effect.
    ///
    /// `SNIs`, `Hosts`, `Divert` and `DNSCache` are only consulted after a
    /// matching `hijack-tls`, `hijack-http`, `divert` or `cache` rule fires.
    /// The tool silently ignores orphaned entries, which usually means a
    /// scenario is not testing what its author intended.
    pub fn lint(&self) -> Vec<LintWarning> {
        let mut warnings = Vec::new();

        let has_endpoint = |fault: EndpointFault| self.endpoints.values().any(|f| *f == fault);

        if !self.snis.is_empty() && !has_endpoint(EndpointFault::HijackTls) {
            warnings.extend(
                self.snis
                    .keys()
                    .map(|sni| LintWarning::SniWithoutTlsHijack(sni.clone())),
            );
        }

        if !self.hosts.is_empty() && !has_endpoint(EndpointFault::HijackHttp) {
            warnings.extend(
                self.hosts
                    .keys()
                    .map(|host| LintWarning::HostWithoutHttpHijack(host.clone())),
            );
        }

        for (endpoint, fault) in &self.endpoints {
            if *fault == EndpointFault::Divert && !self.divert.contains_key(endpoint) {
                warnings.push(LintWarning::MissingDivertTarget(*endpoint));
            }
        }

        for source in self.divert.keys() {
            if self.endpoints.get(source) != Some(&EndpointFault::Divert) {
                warnings.push(LintWarning::DivertWithoutRule(*source));
            }
        }

        for (domain, fault) in &self.domains {
            if *fault == DnsFault::Cache
                && self.dns_cache.get(domain).map_or(true, |ips| ips.is_empty())
            {
                warnings.push(LintWarning::MissingCacheEntry(domain.clone()));
            }
        }

        for domain in self.dns_cache.keys() {
            if self.domains.get(domain) != Some(&DnsFault::Cache) {
                warnings.push(LintWarning::CacheWithoutRule(domain.clone()));
            }
        }

        warnings
    }
}

/// A rule that the measurement tool will never consult.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintWarning {
    SniWithoutTlsHijack(String),
    HostWithoutHttpHijack(String),
    MissingDivertTarget(Endpoint),
    DivertWithoutRule(Endpoint),
    MissingCacheEntry(String),
    CacheWithoutRule(String),
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintWarning::SniWithoutTlsHijack(sni) => {
                write!(f, "SNIs[{sni}] has no hijack-tls endpoint to apply to")
            }
            LintWarning::HostWithoutHttpHijack(host) => {
                write!(f, "Hosts[{host}] has no hijack-http endpoint to apply to")
            }
            LintWarning::MissingDivertTarget(ep) => {
                write!(f, "Endpoints[{ep}] is divert but Divert has no target")
            }
            LintWarning::DivertWithoutRule(ep) => {
                write!(f, "Divert[{ep}] is unused: Endpoints[{ep}] is not divert")
            }
            LintWarning::MissingCacheEntry(domain) => {
                write!(f, "Domains[{domain}] is cache but DNSCache has no addresses")
            }
            LintWarning::CacheWithoutRule(domain) => {
                write!(f, "DNSCache[{domain}] is unused: Domains[{domain}] is not cache")
            }
        }
    }
}

/// Incremental construction of an [`InterferenceSpec`].
///
/// Later rules for the same key replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct InterferenceBuilder {
    spec: InterferenceSpec,
}

impl InterferenceBuilder {
    pub fn domain(mut self, domain: impl Into<String>, fault: DnsFault) -> Self {
        self.spec.domains.insert(domain.into(), fault);
        self
    }

    /// Adds a `DNSCache` entry; the address order is preserved.
    pub fn dns_cache(
        mut self,
        domain: impl Into<String>,
        addrs: impl IntoIterator<Item = IpAddr>,
    ) -> Self {
        self.spec
            .dns_cache
            .insert(domain.into(), addrs.into_iter().collect());
        self
    }

    pub fn endpoint(mut self, endpoint: Endpoint, fault: EndpointFault) -> Self {
        self.spec.endpoints.insert(endpoint, fault);
        self
    }

    pub fn endpoints(mut self, rules: impl IntoIterator<Item = (Endpoint, EndpointFault)>) -> Self {
        self.spec.endpoints.extend(rules);
        self
    }

    pub fn sni(mut self, sni: impl Into<String>, fault: TlsFault) -> Self {
        self.spec.snis.insert(sni.into(), fault);
        self
    }

    pub fn host(mut self, host: impl Into<String>, fault: HttpFault) -> Self {
        self.spec.hosts.insert(host.into(), fault);
        self
    }

    /// Adds a `Divert` table entry. The matching `divert` endpoint rule is
    /// not implied; add it with [`InterferenceBuilder::endpoint`].
    pub fn divert(mut self, from: Endpoint, to: Endpoint) -> Self {
        self.spec.divert.insert(from, to);
        self
    }

    pub fn build(self) -> InterferenceSpec {
        self.spec
    }
}

/// Rules that send every query to a well-known public resolver into the
/// tool's censoring resolver, so `Domains` rules also apply to lookups that
/// bypass the system resolver.
pub fn hijack_popular_dns_servers() -> Vec<(Endpoint, EndpointFault)> {
    const RESOLVERS: [Ipv4Addr; 6] = [
        // cloudflare
        Ipv4Addr::new(1, 1, 1, 1),
        Ipv4Addr::new(1, 0, 0, 1),
        // google
        Ipv4Addr::new(8, 8, 8, 8),
        Ipv4Addr::new(8, 8, 4, 4),
        // quad9
        Ipv4Addr::new(9, 9, 9, 9),
        Ipv4Addr::new(9, 9, 9, 10),
    ];
    RESOLVERS
        .into_iter()
        .map(|ip| (Endpoint::udp(ip, 53), EndpointFault::HijackDns))
        .collect()
}
