use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use super::ConfigError;

/// Authentication strategy toggles and their settings.
///
/// Each strategy is independent; the enabled ones run in a fixed order
/// (OAuth, Basic, certificate, trusted consumer, trusted user).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub oauth: OAuthConfig,
    pub basic: BasicAuthConfig,
    pub certificate: CertificateAuthConfig,
    pub trusted: TrustedAuthConfig,
}

impl AuthConfig {
    /// Names of the enabled strategies, in chain order.
    pub fn enabled_strategies(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.oauth.enabled {
            names.push("oauth");
        }
        if self.basic.enabled {
            names.push("basic");
        }
        if self.certificate.enabled {
            names.push("certificate");
        }
        if self.trusted.enabled {
            names.push("trusted_consumer");
            names.push("trusted_user");
        }
        names
    }
}

/// Two-legged OAuth 1.0a request signing.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OAuthConfig {
    pub enabled: bool,

    /// Shared secrets by OAuth consumer key.
    ///
    /// ```toml
    /// [auth.oauth.consumers]
    /// billing = "${BILLING_OAUTH_SECRET}"
    /// ```
    pub consumers: HashMap<String, String>,

    /// Public base URL (`https://entitlements.example.com`) used to rebuild the
    /// signed URI when the server sits behind a proxy. Defaults to
    /// `http://` plus the request's `Host` header.
    pub base_url: Option<String>,

    /// Maximum distance between `oauth_timestamp` and the server clock.
    /// `0` disables the check.
    pub max_clock_skew_secs: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            consumers: HashMap::new(),
            base_url: None,
            max_clock_skew_secs: 300,
        }
    }
}

impl OAuthConfig {
    /// Parse `base_url`, which must be an absolute http(s) URL with a host.
    pub fn parsed_base_url(&self) -> Result<Option<Url>, ConfigError> {
        let Some(raw) = &self.base_url else {
            return Ok(None);
        };
        let url = Url::parse(raw).map_err(|e| {
            ConfigError::Validation(format!("auth.oauth.base_url '{}' is invalid: {}", raw, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "auth.oauth.base_url must use http or https, got '{}'",
                raw
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ConfigError::Validation(format!(
                "auth.oauth.base_url '{}' has no host",
                raw
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::Validation(format!(
                "auth.oauth.base_url '{}' must not carry a query or fragment",
                raw
            )));
        }
        Ok(Some(url))
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("enabled", &self.enabled)
            .field("consumers", &self.consumers.keys().collect::<Vec<_>>())
            .field("base_url", &self.base_url)
            .field("max_clock_skew_secs", &self.max_clock_skew_secs)
            .finish()
    }
}

/// HTTP Basic authentication against the configured user service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BasicAuthConfig {
    pub enabled: bool,
}

/// Client certificate authentication.
///
/// The subject DN is taken from a [`ClientCertificate`](crate::auth::ClientCertificate)
/// request extension when the listener terminates TLS itself, or from
/// `subject_header` when a TLS-terminating proxy forwards it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CertificateAuthConfig {
    pub enabled: bool,
    /// Header carrying the verified client certificate subject DN,
    /// e.g. `X-SSL-Client-S-DN`.
    pub subject_header: Option<String>,
}

/// Identity asserted by headers from a trusted upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrustedAuthConfig {
    pub enabled: bool,
    /// Header carrying a consumer UUID.
    pub consumer_header: String,
    /// Header carrying a username.
    pub user_header: String,
}

impl Default for TrustedAuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            consumer_header: "cp-consumer".to_string(),
            user_header: "cp-user".to_string(),
        }
    }
}
