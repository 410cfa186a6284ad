use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Transport protocol half of an endpoint key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointParseError {
    #[error("endpoint {0:?} is missing the /proto suffix")]
    MissingTransport(String),
    #[error("endpoint {0:?} has unknown transport (want tcp or udp)")]
    UnknownTransport(String),
    #[error("endpoint {0:?} is not ip:port (IPv6 must be bracketed)")]
    BadAddress(String),
}

/// A TCP or UDP endpoint, written as `ip:port/proto` on the wire.
///
/// IPv6 addresses are bracketed, e.g. `[2001:4860:4860::8888]:443/udp`,
/// which is exactly what [`SocketAddr`]'s `Display` produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Endpoint {
    /// Address and port the rule applies to.
    pub addr: SocketAddr,
    /// Protocol half of the `ip:port/proto` key.
    pub transport: Transport,
}

impl Endpoint {
    pub fn new(ip: impl Into<IpAddr>, port: u16, transport: Transport) -> Self {
        Self {
            addr: SocketAddr::new(ip.into(), port),
            transport,
        }
    }

    pub fn tcp(ip: impl Into<IpAddr>, port: u16) -> Self {
        Self::new(ip, port, Transport::Tcp)
    }

    pub fn udp(ip: impl Into<IpAddr>, port: u16) -> Self {
        Self::new(ip, port, Transport::Udp)
    }

    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.transport)
    }
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, proto) = s
            .rsplit_once('/')
            .ok_or_else(|| EndpointParseError::MissingTransport(s.to_string()))?;
        let transport = match proto {
            "tcp" => Transport::Tcp,
            "udp" => Transport::Udp,
            _ => return Err(EndpointParseError::UnknownTransport(s.to_string())),
        };
        let addr = addr
            .parse::<SocketAddr>()
            .map_err(|_| EndpointParseError::BadAddress(s.to_string()))?;
        Ok(Self { addr, transport })
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EndpointVisitor;

        impl Visitor<'_> for EndpointVisitor {
            type Value = Endpoint;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an endpoint string like 1.2.3.4:443/tcp")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Endpoint, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(EndpointVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn ipv4_endpoint_formats_without_brackets() {
        let ep = Endpoint::tcp(Ipv4Addr::new(130, 192, 16, 171), 443);
        assert_eq!(ep.to_string(), "130.192.16.171:443/tcp");
    }

    #[test]
    fn ipv6_endpoint_is_bracketed() {
        let ip: Ipv6Addr = "2001:4860:4860::8888".parse().unwrap();
        let ep = Endpoint::udp(ip, 443);
        assert_eq!(ep.to_string(), "[2001:4860:4860::8888]:443/udp");
    }

    #[test]
    fn parses_both_families() {
        let v4: Endpoint = "8.8.4.4:53/udp".parse().unwrap();
        assert_eq!(v4.port(), 53);
        assert_eq!(v4.transport, Transport::Udp);

        let v6: Endpoint = "[2001:4860:4860::8844]:443/udp".parse().unwrap();
        assert!(v6.ip().is_ipv6());
        assert_eq!(v6.to_string(), "[2001:4860:4860::8844]:443/udp");
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(matches!(
            "8.8.8.8:443".parse::<Endpoint>(),
            Err(EndpointParseError::MissingTransport(_))
        ));
        assert!(matches!(
            "8.8.8.8:443/sctp".parse::<Endpoint>(),
            Err(EndpointParseError::UnknownTransport(_))
        ));
        assert!(matches!(
            "2001:4860:4860::8888:443/udp".parse::<Endpoint>(),
            Err(EndpointParseError::BadAddress(_))
        ));
        assert!(matches!(
            "dns.google:443/tcp".parse::<Endpoint>(),
            Err(EndpointParseError::BadAddress(_))
        ));
    }

    #[test]
    fn serde_uses_the_string_form() {
        let ep: Endpoint = "1.1.1.1:443/udp".parse().unwrap();
        let json = serde_json::to_string(&ep).unwrap();
        assert_eq!(json, "\"1.1.1.1:443/udp\"");
        let back: Endpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ep);
    }
}
