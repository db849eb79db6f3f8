//! Authentication strategies.
//!
//! Each strategy looks at the request head and either produces a
//! [`Principal`] or abstains. Strategies never reject a request: malformed
//! credentials, bad signatures and backend outages all degrade to "this
//! strategy did not match" so the next one in the chain gets a turn.

mod basic;
mod certificate;
mod oauth;
mod trusted;

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use axum::extract::ConnectInfo;
pub use basic::BasicAuth;
pub use certificate::{CertificateAuth, ClientCertificate};
use http::request::Parts;
pub use oauth::{OAuthAuth, SignatureMethod, sign, signature_base_string};
pub use trusted::{TrustedConsumerAuth, TrustedUserAuth};

use super::{AuthError, Principal};
use crate::config::TrustedProxiesConfig;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Short strategy name used in logs and `check` output.
    fn name(&self) -> &'static str;

    /// Inspect the request head.
    ///
    /// `Ok(None)` means the request carries nothing for this strategy.
    async fn authenticate(&self, parts: &Parts) -> Result<Option<Principal>, AuthError>;

    /// [`authenticate`](Self::authenticate) with every failure turned into
    /// abstention.
    async fn try_authenticate(&self, parts: &Parts) -> Option<Principal> {
        match self.authenticate(parts).await {
            Ok(principal) => principal,
            Err(e) if e.is_backend() => {
                tracing::warn!(provider = self.name(), error = %e, "Authentication backend failed");
                None
            }
            Err(e) => {
                tracing::debug!(provider = self.name(), error = %e, "Credentials rejected");
                None
            }
        }
    }
}

/// Address of the directly connected peer, when the listener recorded it.
pub(crate) fn connecting_ip(parts: &Parts) -> Option<IpAddr> {
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Gate for headers that assert identity without a credential.
///
/// Returns `Err(UntrustedSource)` when trusted proxies are configured and the
/// peer is not one of them.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProxyGate {
    config: TrustedProxiesConfig,
    cidrs: Vec<ipnet::IpNet>,
}

impl ProxyGate {
    pub(crate) fn new(config: &TrustedProxiesConfig) -> Self {
        Self {
            cidrs: config.parsed_cidrs(),
            config: config.clone(),
        }
    }

    pub(crate) fn check(&self, parts: &Parts, header: &str) -> Result<(), AuthError> {
        if !self.config.is_configured() {
            return Ok(());
        }

        let trusted = match connecting_ip(parts) {
            Some(ip) => self.config.is_trusted_ip(ip, &self.cidrs),
            // No connecting IP available: only trust if dangerously_trust_all is set
            None => self.config.dangerously_trust_all,
        };

        if trusted {
            Ok(())
        } else {
            if let Some(ip) = connecting_ip(parts) {
                tracing::warn!(
                    connecting_ip = %ip,
                    header,
                    "Ignoring identity header from untrusted peer - \
                     configure server.trusted_proxies to trust this source"
                );
            }
            Err(AuthError::UntrustedSource(header.to_string()))
        }
    }
}

/// Non-empty, visible-ASCII value of a header.
pub(crate) fn header_str<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, AuthError> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| AuthError::Malformed(format!("invalid {} header encoding", name)))?
                .trim();
            Ok((!value.is_empty()).then_some(value))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{test_support::*, *};

    struct Failing {
        backend: bool,
    }

    #[async_trait]
    impl AuthProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn authenticate(&self, _parts: &Parts) -> Result<Option<Principal>, AuthError> {
            if self.backend {
                Err(crate::directory::DirectoryError::Backend("down".into()).into())
            } else {
                Err(AuthError::InvalidSignature)
            }
        }
    }

    #[tokio::test]
    async fn test_try_authenticate_swallows_errors() {
        let parts = make_parts("GET", "/", &[]);
        for backend in [false, true] {
            assert!(Failing { backend }.try_authenticate(&parts).await.is_none());
        }
    }

    #[test]
    fn test_proxy_gate_unconfigured_trusts_everyone() {
        let gate = ProxyGate::new(&TrustedProxiesConfig::default());
        let parts = with_peer(make_parts("GET", "/", &[]), "203.0.113.9:5000");
        assert!(gate.check(&parts, "cp-user").is_ok());
        assert!(gate.check(&make_parts("GET", "/", &[]), "cp-user").is_ok());
    }

    #[test]
    fn test_proxy_gate_checks_peer() {
        let gate = ProxyGate::new(&TrustedProxiesConfig {
            dangerously_trust_all: false,
            cidrs: vec!["10.0.0.0/8".into()],
        });

        let proxied = with_peer(make_parts("GET", "/", &[]), "10.1.1.1:4000");
        assert!(gate.check(&proxied, "cp-user").is_ok());

        let direct = with_peer(make_parts("GET", "/", &[]), "203.0.113.9:5000");
        assert!(matches!(
            gate.check(&direct, "cp-user"),
            Err(AuthError::UntrustedSource(_))
        ));

        // Unknown peer is untrusted unless trusting everyone
        assert!(gate.check(&make_parts("GET", "/", &[]), "cp-user").is_err());
    }

    #[test]
    fn test_header_str() {
        let parts = make_parts("GET", "/", &[("cp-user", "  alice "), ("x-empty", " ")]);
        assert_eq!(header_str(&parts, "cp-user").unwrap(), Some("alice"));
        assert_eq!(header_str(&parts, "x-empty").unwrap(), None);
        assert_eq!(header_str(&parts, "x-missing").unwrap(), None);
    }
}
