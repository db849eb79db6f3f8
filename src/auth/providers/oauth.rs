//! Two-legged OAuth 1.0a request signing (RFC 5849).
//!
//! Trusted upstream systems sign each request with a shared consumer secret.
//! There is no token: the signing key is `encode(secret) + "&"`. Once the
//! signature checks out, the request may additionally name the consumer or
//! user it acts for via the trusted headers; otherwise the caller itself is
//! the principal, as a trusted system named after its consumer key.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use http::{header::AUTHORIZATION, request::Parts};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use url::Url;

use super::{AuthProvider, TrustedConsumerAuth, TrustedUserAuth, header_str};
use crate::{
    auth::{AuthError, Principal},
    config::{ConfigError, OAuthConfig, TrustedAuthConfig},
    directory::UserServiceAdapter,
    store::ConsumerStore,
};

/// RFC 3986 unreserved characters pass through; everything else is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const REQUIRED_PARAMS: [&str; 5] = [
    "oauth_consumer_key",
    "oauth_signature_method",
    "oauth_signature",
    "oauth_timestamp",
    "oauth_nonce",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    HmacSha1,
    HmacSha256,
    Plaintext,
}

impl SignatureMethod {
    pub fn parse(value: &str) -> Result<Self, AuthError> {
        match value {
            "HMAC-SHA1" => Ok(Self::HmacSha1),
            "HMAC-SHA256" => Ok(Self::HmacSha256),
            "PLAINTEXT" => Ok(Self::Plaintext),
            other => Err(AuthError::UnsupportedSignatureMethod(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacSha1 => "HMAC-SHA1",
            Self::HmacSha256 => "HMAC-SHA256",
            Self::Plaintext => "PLAINTEXT",
        }
    }
}

pub struct OAuthAuth {
    secrets: HashMap<String, String>,
    base_url: Option<Url>,
    max_clock_skew_secs: u64,
    on_behalf_of_consumer: TrustedConsumerAuth,
    on_behalf_of_user: Option<TrustedUserAuth>,
}

impl OAuthAuth {
    /// `users` is optional: without a user directory the user header is
    /// ignored on signed requests.
    pub fn new(
        config: &OAuthConfig,
        trusted: &TrustedAuthConfig,
        consumers: Arc<dyn ConsumerStore>,
        users: Option<Arc<dyn UserServiceAdapter>>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            secrets: config.consumers.clone(),
            base_url: config.parsed_base_url()?,
            max_clock_skew_secs: config.max_clock_skew_secs,
            on_behalf_of_consumer: TrustedConsumerAuth::ungated(
                &trusted.consumer_header,
                consumers,
            ),
            on_behalf_of_user: users.map(|u| TrustedUserAuth::ungated(&trusted.user_header, u)),
        })
    }

    fn check_timestamp(&self, timestamp: &str) -> Result<(), AuthError> {
        let timestamp: i64 = timestamp
            .parse()
            .map_err(|_| AuthError::Malformed(format!("invalid oauth_timestamp '{}'", timestamp)))?;
        if self.max_clock_skew_secs == 0 {
            return Ok(());
        }
        let skew = Utc::now().timestamp().abs_diff(timestamp);
        if skew > self.max_clock_skew_secs {
            return Err(AuthError::StaleTimestamp {
                timestamp,
                max_skew_secs: self.max_clock_skew_secs,
            });
        }
        Ok(())
    }

    /// Scheme, authority and path the client signed.
    fn base_uri(&self, parts: &Parts) -> Result<String, AuthError> {
        let path = parts.uri.path();

        if let Some(base_url) = &self.base_url {
            return Ok(format!(
                "{}{}{}",
                origin(base_url)?,
                base_url.path().trim_end_matches('/'),
                path
            ));
        }

        let (scheme, authority) = match parts.uri.authority() {
            Some(authority) => (parts.uri.scheme_str().unwrap_or("http"), authority.as_str()),
            None => (
                "http",
                header_str(parts, http::header::HOST.as_str())?
                    .ok_or_else(|| AuthError::Malformed("missing Host header".into()))?,
            ),
        };
        let url = Url::parse(&format!("{}://{}/", scheme, authority))
            .map_err(|e| AuthError::Malformed(format!("invalid request authority: {}", e)))?;
        Ok(format!("{}{}", origin(&url)?, path))
    }

    /// A valid signature authenticates the caller; the trusted headers then
    /// decide whom it acts for.
    async fn resolve_signed(&self, parts: &Parts, consumer_key: &str) -> Principal {
        if let Some(principal) = self.on_behalf_of_consumer.try_authenticate(parts).await {
            return principal;
        }
        if let Some(users) = &self.on_behalf_of_user
            && let Some(principal) = users.try_authenticate(parts).await
        {
            return principal;
        }
        Principal::trusted_system(consumer_key)
    }
}

#[async_trait]
impl AuthProvider for OAuthAuth {
    fn name(&self) -> &'static str {
        "oauth"
    }

    async fn authenticate(&self, parts: &Parts) -> Result<Option<Principal>, AuthError> {
        let Some(header) = header_str(parts, AUTHORIZATION.as_str())? else {
            return Ok(None);
        };
        let Some(credentials) = header
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("OAuth"))
            .map(|(_, rest)| rest)
        else {
            return Ok(None);
        };

        let header_params = parse_authorization_params(credentials)?;
        let param = |name: &str| {
            header_params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };

        for name in REQUIRED_PARAMS {
            if param(name).is_none() {
                return Err(AuthError::Malformed(format!("missing {}", name)));
            }
        }
        if let Some(version) = param("oauth_version")
            && version != "1.0"
        {
            return Err(AuthError::Malformed(format!(
                "unsupported oauth_version '{}'",
                version
            )));
        }

        let consumer_key = param("oauth_consumer_key").unwrap_or_default();
        let secret = self
            .secrets
            .get(consumer_key)
            .ok_or_else(|| AuthError::UnknownConsumerKey(consumer_key.to_string()))?;
        let method = SignatureMethod::parse(param("oauth_signature_method").unwrap_or_default())?;
        self.check_timestamp(param("oauth_timestamp").unwrap_or_default())?;

        let mut signed_params: Vec<(String, String)> = header_params
            .iter()
            .filter(|(k, _)| k != "oauth_signature" && k != "realm")
            .cloned()
            .collect();
        signed_params.extend(query_params(parts.uri.query()));

        let base_string =
            signature_base_string(parts.method.as_str(), &self.base_uri(parts)?, &signed_params);
        verify(
            method,
            secret,
            &base_string,
            param("oauth_signature").unwrap_or_default(),
        )?;

        tracing::debug!(consumer_key, method = method.as_str(), "OAuth signature verified");
        Ok(Some(self.resolve_signed(parts, consumer_key).await))
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

fn decode(value: &str) -> Result<String, AuthError> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| AuthError::Malformed("invalid percent-encoding".into()))
}

/// `scheme://host[:port]`; `Url` already lower-cases the host and drops
/// the scheme's default port.
fn origin(url: &Url) -> Result<String, AuthError> {
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AuthError::Malformed("base URI has no host".into()))?;
    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Decode the `k="v", ...` list after the `OAuth` scheme.
fn parse_authorization_params(credentials: &str) -> Result<Vec<(String, String)>, AuthError> {
    let mut params: Vec<(String, String)> = Vec::new();
    for item in credentials.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| AuthError::Malformed(format!("invalid oauth parameter '{}'", item)))?;
        let value = value
            .trim()
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .ok_or_else(|| AuthError::Malformed(format!("unquoted oauth parameter '{}'", key)))?;

        let key = decode(key.trim())?;
        if params.iter().any(|(k, _)| *k == key) {
            return Err(AuthError::Malformed(format!("duplicate oauth parameter '{}'", key)));
        }
        params.push((key, decode(value)?));
    }
    Ok(params)
}

/// Query string parameters, decoded as `application/x-www-form-urlencoded`.
fn query_params(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Signature base string (RFC 5849 §3.4.1).
pub fn signature_base_string(method: &str, base_uri: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(base_uri),
        encode(&normalized)
    )
}

fn signing_key(secret: &str) -> String {
    format!("{}&", encode(secret))
}

/// Compute the `oauth_signature` value (before header percent-encoding).
pub fn sign(method: SignatureMethod, secret: &str, base_string: &str) -> String {
    let key = signing_key(secret);
    match method {
        SignatureMethod::HmacSha1 => {
            // HMAC accepts keys of any length.
            let Ok(mut mac) = Hmac::<Sha1>::new_from_slice(key.as_bytes()) else {
                return String::new();
            };
            mac.update(base_string.as_bytes());
            STANDARD.encode(mac.finalize().into_bytes())
        }
        SignatureMethod::HmacSha256 => {
            let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(key.as_bytes()) else {
                return String::new();
            };
            mac.update(base_string.as_bytes());
            STANDARD.encode(mac.finalize().into_bytes())
        }
        SignatureMethod::Plaintext => key,
    }
}

fn verify(
    method: SignatureMethod,
    secret: &str,
    base_string: &str,
    signature: &str,
) -> Result<(), AuthError> {
    let key = signing_key(secret);
    let valid = match method {
        SignatureMethod::HmacSha1 => {
            let provided = STANDARD
                .decode(signature)
                .map_err(|_| AuthError::Malformed("signature is not base64".into()))?;
            let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
                .map_err(|_| AuthError::InvalidSignature)?;
            mac.update(base_string.as_bytes());
            mac.verify_slice(&provided).is_ok()
        }
        SignatureMethod::HmacSha256 => {
            let provided = STANDARD
                .decode(signature)
                .map_err(|_| AuthError::Malformed("signature is not base64".into()))?;
            let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
                .map_err(|_| AuthError::InvalidSignature)?;
            mac.update(base_string.as_bytes());
            mac.verify_slice(&provided).is_ok()
        }
        SignatureMethod::Plaintext => key.as_bytes().ct_eq(signature.as_bytes()).into(),
    };

    if valid {
        Ok(())
    } else {
        Err(AuthError::InvalidSignature)
    }
}
