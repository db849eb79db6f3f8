//! Client certificate authentication.
//!
//! The certificate's subject common name is the consumer UUID issued at
//! registration. Certificate verification itself happens in the transport:
//! either the listener attaches a [`ClientCertificate`] to the request, or a
//! TLS-terminating proxy forwards the verified subject in a header.

use std::sync::Arc;

use async_trait::async_trait;
use http::request::Parts;
use uuid::Uuid;

use super::{AuthProvider, ProxyGate, header_str};
use crate::{
    auth::{AuthError, Principal},
    config::{CertificateAuthConfig, TrustedProxiesConfig},
    store::ConsumerStore,
};

/// Verified peer certificate, inserted into request extensions by a TLS
/// listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    /// Subject distinguished name, e.g. `CN=<uuid>, O=acme`.
    pub subject_dn: String,
}

impl ClientCertificate {
    pub fn new(subject_dn: impl Into<String>) -> Self {
        Self {
            subject_dn: subject_dn.into(),
        }
    }
}

pub struct CertificateAuth {
    subject_header: Option<String>,
    consumers: Arc<dyn ConsumerStore>,
    gate: ProxyGate,
}

impl CertificateAuth {
    pub fn new(
        config: &CertificateAuthConfig,
        consumers: Arc<dyn ConsumerStore>,
        trusted_proxies: &TrustedProxiesConfig,
    ) -> Self {
        Self {
            subject_header: config.subject_header.clone(),
            consumers,
            gate: ProxyGate::new(trusted_proxies),
        }
    }

    fn subject<'a>(&self, parts: &'a Parts) -> Result<Option<&'a str>, AuthError> {
        if let Some(cert) = parts.extensions.get::<ClientCertificate>() {
            return Ok(Some(cert.subject_dn.as_str()));
        }
        let Some(header) = &self.subject_header else {
            return Ok(None);
        };
        let Some(subject) = header_str(parts, header)? else {
            return Ok(None);
        };
        self.gate.check(parts, header)?;
        Ok(Some(subject))
    }
}

/// Common name from a subject DN.
///
/// Accepts the RFC 4514 form (`CN=x,O=y`) and the OpenSSL one-line form
/// (`/O=y/CN=x`).
pub fn common_name(subject_dn: &str) -> Option<&str> {
    let subject_dn = subject_dn.trim();
    let (rdns, separator) = match subject_dn.strip_prefix('/') {
        Some(rest) => (rest, '/'),
        None => (subject_dn, ','),
    };
    rdns.split(separator).find_map(|rdn| {
        let (attr, value) = rdn.split_once('=')?;
        attr.trim()
            .eq_ignore_ascii_case("CN")
            .then(|| value.trim())
            .filter(|v| !v.is_empty())
    })
}

#[async_trait]
impl AuthProvider for CertificateAuth {
    fn name(&self) -> &'static str {
        "certificate"
    }

    async fn authenticate(&self, parts: &Parts) -> Result<Option<Principal>, AuthError> {
        let Some(subject) = self.subject(parts)? else {
            return Ok(None);
        };
        let cn = common_name(subject)
            .ok_or_else(|| AuthError::Malformed(format!("no CN in subject '{}'", subject)))?;
        let uuid = Uuid::parse_str(cn)
            .map_err(|_| AuthError::Malformed(format!("certificate CN '{}' is not a UUID", cn)))?;

        match self.consumers.find_by_uuid(uuid).await? {
            Some(consumer) => Ok(Some(Principal::consumer(consumer))),
            None => {
                tracing::debug!(consumer_uuid = %uuid, "Client certificate for unknown consumer");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{super::test_support::*, *};
    use crate::{models::Consumer, store::MemoryStore};

    fn provider(
        subject_header: Option<&str>,
        proxies: TrustedProxiesConfig,
    ) -> (CertificateAuth, Consumer) {
        let store = MemoryStore::new();
        let consumer = Consumer::new(Uuid::new_v4(), "web-01", "acme");
        store.insert_consumer(consumer.clone());
        let config = CertificateAuthConfig {
            enabled: true,
            subject_header: subject_header.map(String::from),
        };
        (
            CertificateAuth::new(&config, Arc::new(store), &proxies),
            consumer,
        )
    }

    #[rstest]
    #[case("CN=abc", Some("abc"))]
    #[case("CN=abc, O=acme", Some("abc"))]
    #[case("O=acme,cn=abc", Some("abc"))]
    #[case("/O=acme/CN=abc", Some("abc"))]
    #[case("O=acme", None)]
    #[case("CN=", None)]
    #[case("", None)]
    fn test_common_name(#[case] subject: &str, #[case] expected: Option<&str>) {
        assert_eq!(common_name(subject), expected);
    }

    #[tokio::test]
    async fn test_certificate_extension() {
        let (auth, consumer) = provider(None, TrustedProxiesConfig::default());
        let mut parts = make_parts("GET", "/", &[]);
        parts
            .extensions
            .insert(ClientCertificate::new(format!("CN={}, O=acme", consumer.uuid)));

        assert_eq!(
            auth.authenticate(&parts).await.unwrap(),
            Some(Principal::consumer(consumer))
        );
    }

    #[tokio::test]
    async fn test_subject_header() {
        let (auth, consumer) = provider(Some("x-ssl-client-s-dn"), TrustedProxiesConfig::default());
        let subject = format!("/O=acme/CN={}", consumer.uuid);
        let parts = make_parts("GET", "/", &[("x-ssl-client-s-dn", &subject)]);

        assert_eq!(
            auth.authenticate(&parts).await.unwrap(),
            Some(Principal::consumer(consumer))
        );
    }

    #[tokio::test]
    async fn test_header_ignored_when_not_configured() {
        let (auth, consumer) = provider(None, TrustedProxiesConfig::default());
        let subject = format!("CN={}", consumer.uuid);
        let parts = make_parts("GET", "/", &[("x-ssl-client-s-dn", &subject)]);

        assert_eq!(auth.authenticate(&parts).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_consumer_abstains() {
        let (auth, _) = provider(None, TrustedProxiesConfig::default());
        let mut parts = make_parts("GET", "/", &[]);
        parts
            .extensions
            .insert(ClientCertificate::new(format!("CN={}", Uuid::new_v4())));

        assert_eq!(auth.authenticate(&parts).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_uuid_cn_is_malformed() {
        let (auth, _) = provider(None, TrustedProxiesConfig::default());
        let mut parts = make_parts("GET", "/", &[]);
        parts
            .extensions
            .insert(ClientCertificate::new("CN=laptop.example.com"));

        assert!(matches!(
            auth.authenticate(&parts).await,
            Err(AuthError::Malformed(_))
        ));
        assert!(auth.try_authenticate(&parts).await.is_none());
    }

    #[tokio::test]
    async fn test_subject_header_from_untrusted_peer() {
        let proxies = TrustedProxiesConfig {
            dangerously_trust_all: false,
            cidrs: vec!["10.0.0.0/8".into()],
        };
        let (auth, consumer) = provider(Some("x-ssl-client-s-dn"), proxies);
        let subject = format!("CN={}", consumer.uuid);
        let parts = with_peer(
            make_parts("GET", "/", &[("x-ssl-client-s-dn", &subject)]),
            "192.0.2.1:1234",
        );

        assert!(auth.try_authenticate(&parts).await.is_none());
    }
}
