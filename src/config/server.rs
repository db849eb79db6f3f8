use std::net::{IpAddr, Ipv4Addr};

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Peers allowed to assert identity through headers (trusted-header auth
    /// and the client certificate subject header).
    #[serde(default)]
    pub trusted_proxies: TrustedProxiesConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            trusted_proxies: TrustedProxiesConfig::default(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Configuration for trusted reverse proxies.
///
/// Identity headers (`cp-consumer`, `cp-user`, a forwarded certificate
/// subject) carry no credential of their own. When this section is
/// configured they are only honoured if the connecting peer falls inside one
/// of the CIDRs. When it is left empty they are honoured from any peer, which
/// is only safe if the server is unreachable except through such a proxy.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TrustedProxiesConfig {
    /// Trust every peer, even when the connecting address is unknown.
    #[serde(default)]
    pub dangerously_trust_all: bool,

    /// Trusted proxy CIDR ranges (e.g. `["10.0.0.0/8"]`).
    #[serde(default)]
    pub cidrs: Vec<String>,
}

impl TrustedProxiesConfig {
    /// Parse the CIDR strings. Entries that fail to parse are logged and skipped;
    /// `validate` rejects them at startup.
    pub fn parsed_cidrs(&self) -> Vec<IpNet> {
        self.cidrs
            .iter()
            .filter_map(|cidr_str| {
                cidr_str.parse::<IpNet>().ok().or_else(|| {
                    tracing::warn!(
                        cidr = %cidr_str,
                        "Invalid CIDR in trusted_proxies config, skipping"
                    );
                    None
                })
            })
            .collect()
    }

    pub fn is_trusted_ip(&self, ip: IpAddr, parsed_cidrs: &[IpNet]) -> bool {
        if self.dangerously_trust_all {
            return true;
        }
        parsed_cidrs.iter().any(|cidr| cidr.contains(&ip))
    }

    /// Returns true if peer checks are in force.
    pub fn is_configured(&self) -> bool {
        self.dangerously_trust_all || !self.cidrs.is_empty()
    }

    pub(super) fn validate(&self) -> Result<(), String> {
        for cidr in &self.cidrs {
            cidr.parse::<IpNet>()
                .map_err(|e| format!("invalid trusted proxy CIDR '{}': {}", cidr, e))?;
        }
        Ok(())
    }
}
