//! Fault kinds understood by the measurement tool's censorship simulator.
//!
//! The string forms are part of the interoperability contract, so every
//! variant carries an explicit serde name.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the simulated resolver does for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DnsFault {
    #[serde(rename = "pass")]
    Pass,
    #[serde(rename = "nxdomain")]
    Nxdomain,
    #[serde(rename = "refused")]
    Refused,
    #[serde(rename = "localhost")]
    Localhost,
    #[serde(rename = "no-answer")]
    NoAnswer,
    #[serde(rename = "timeout")]
    Timeout,
    /// Answer from the `DNSCache` table.
    #[serde(rename = "cache")]
    Cache,
}

/// What happens to traffic for an `ip:port/proto` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointFault {
    #[serde(rename = "tcp-drop-syn")]
    TcpDropSyn,
    #[serde(rename = "tcp-reject-syn")]
    TcpRejectSyn,
    #[serde(rename = "drop-data")]
    DropData,
    /// Route to the local censoring resolver; `Domains` rules apply.
    #[serde(rename = "hijack-dns")]
    HijackDns,
    /// Route to the local TLS server; `SNIs` rules apply.
    #[serde(rename = "hijack-tls")]
    HijackTls,
    /// Route to the local HTTP server; `Hosts` rules apply.
    #[serde(rename = "hijack-http")]
    HijackHttp,
    /// Rewrite the destination using the `Divert` table.
    #[serde(rename = "divert")]
    Divert,
}

/// Action taken by the hijacking TLS server for a given SNI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TlsFault {
    #[serde(rename = "pass")]
    Pass,
    #[serde(rename = "reset")]
    Reset,
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "eof")]
    Eof,
    #[serde(rename = "alert-internal-error")]
    AlertInternalError,
    #[serde(rename = "alert-unrecognized-name")]
    AlertUnrecognizedName,
}

/// Action taken by the hijacking HTTP server for a given `Host`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpFault {
    #[serde(rename = "pass")]
    Pass,
    #[serde(rename = "reset")]
    Reset,
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "eof")]
    Eof,
    /// Respond with `451 Unavailable For Legal Reasons` and a block page.
    #[serde(rename = "451")]
    Status451,
}

macro_rules! display_via_serde_name {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

display_via_serde_name!(DnsFault {
    Pass => "pass",
    Nxdomain => "nxdomain",
    Refused => "refused",
    Localhost => "localhost",
    NoAnswer => "no-answer",
    Timeout => "timeout",
    Cache => "cache",
});

display_via_serde_name!(EndpointFault {
    TcpDropSyn => "tcp-drop-syn",
    TcpRejectSyn => "tcp-reject-syn",
    DropData => "drop-data",
    HijackDns => "hijack-dns",
    HijackTls => "hijack-tls",
    HijackHttp => "hijack-http",
    Divert => "divert",
});

display_via_serde_name!(TlsFault {
    Pass => "pass",
    Reset => "reset",
    Timeout => "timeout",
    Eof => "eof",
    AlertInternalError => "alert-internal-error",
    AlertUnrecognizedName => "alert-unrecognized-name",
});

display_via_serde_name!(HttpFault {
    Pass => "pass",
    Reset => "reset",
    Timeout => "timeout",
    Eof => "eof",
    Status451 => "451",
});
