//! Configuration module for the entitlement gate.
//!
//! The server is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [server]
//! port = 8443
//!
//! [auth.oauth]
//! enabled = true
//! consumers = { billing = "${BILLING_OAUTH_SECRET}" }
//!
//! [auth.basic]
//! enabled = true
//!
//! [user_service]
//! type = "ldap"
//! host = "ldap.example.com"
//! base = "ou=people,dc=example,dc=com"
//! ```

mod auth;
mod directory;
mod observability;
mod server;

use std::path::Path;

pub use auth::*;
pub use directory::*;
pub use observability::*;
use serde::{Deserialize, Serialize};
pub use server::*;

/// Root configuration.
///
/// All sections are optional. With no sections at all, every authentication
/// strategy is off and every request resolves to the anonymous principal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication strategy toggles.
    #[serde(default)]
    pub auth: AuthConfig,

    /// User directory used by Basic and trusted-user authentication.
    #[serde(default)]
    pub user_service: UserServiceConfig,

    /// Owners and consumers loaded into the in-memory store.
    #[serde(default)]
    pub store: StoreConfig,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: AppConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    ///
    /// Anything that would leave an enabled strategy without what it needs is
    /// fatal here rather than a silent abstention on every request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let auth = &self.auth;

        if auth.oauth.enabled {
            if auth.oauth.consumers.is_empty() {
                return Err(ConfigError::Validation(
                    "auth.oauth is enabled but no consumer secrets are configured \
                     (auth.oauth.consumers)"
                        .into(),
                ));
            }
            if let Some((key, _)) = auth.oauth.consumers.iter().find(|(_, s)| s.is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "auth.oauth.consumers.{} has an empty secret",
                    key
                )));
            }
            auth.oauth.parsed_base_url()?;
        }

        if auth.basic.enabled && !self.user_service.is_configured() {
            return Err(ConfigError::Validation(
                "auth.basic requires a user_service".into(),
            ));
        }

        if auth.certificate.enabled {
            match &auth.certificate.subject_header {
                Some(header) => validate_header_name("auth.certificate.subject_header", header)?,
                None => tracing::warn!(
                    "auth.certificate is enabled without subject_header; only connections \
                     that attach a client certificate extension will authenticate"
                ),
            }
        }

        if auth.trusted.enabled {
            validate_header_name("auth.trusted.consumer_header", &auth.trusted.consumer_header)?;
            validate_header_name("auth.trusted.user_header", &auth.trusted.user_header)?;
            if auth
                .trusted
                .consumer_header
                .eq_ignore_ascii_case(&auth.trusted.user_header)
            {
                return Err(ConfigError::Validation(
                    "auth.trusted.consumer_header and auth.trusted.user_header must differ".into(),
                ));
            }
            if !self.user_service.is_configured() {
                return Err(ConfigError::Validation(
                    "auth.trusted requires a user_service for the user header".into(),
                ));
            }
        }

        #[cfg(not(feature = "ldap"))]
        if matches!(self.user_service, UserServiceConfig::Ldap(_)) {
            return Err(ConfigError::Validation(
                "user_service type 'ldap' requires the 'ldap' feature. \
                 Rebuild with: cargo build --features ldap"
                    .into(),
            ));
        }

        self.server
            .trusted_proxies
            .validate()
            .map_err(ConfigError::Validation)?;

        for consumer in &self.store.consumers {
            if !self.store.owners.iter().any(|o| o.key == consumer.owner) {
                return Err(ConfigError::Validation(format!(
                    "store consumer {} references unknown owner '{}'",
                    consumer.uuid, consumer.owner
                )));
            }
        }

        Ok(())
    }
}

fn validate_header_name(field: &str, value: &str) -> Result<(), ConfigError> {
    http::HeaderName::from_bytes(value.as_bytes())
        .map(|_| ())
        .map_err(|_| {
            ConfigError::Validation(format!("{} is not a valid header name: '{}'", field, value))
        })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            // Skip if this variable is inside a comment
            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::models::Access;

    #[test]
    fn test_empty_config() {
        let config = AppConfig::from_str("").unwrap();
        assert!(config.auth.enabled_strategies().is_empty());
        assert_eq!(config.server.port, 8080);
        assert!(!config.user_service.is_configured());
        assert_eq!(config.auth.oauth.max_clock_skew_secs, 300);
        assert_eq!(config.auth.trusted.consumer_header, "cp-consumer");
        assert_eq!(config.auth.trusted.user_header, "cp-user");
    }

    #[test]
    fn test_full_config() {
        let config = AppConfig::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            trusted_proxies = { cidrs = ["10.0.0.0/8"] }

            [auth.oauth]
            enabled = true
            consumers = { billing = "s3cret" }
            base_url = "https://entitlements.example.com"

            [auth.basic]
            enabled = true

            [auth.certificate]
            enabled = true
            subject_header = "X-SSL-Client-S-DN"

            [auth.trusted]
            enabled = true

            [user_service]
            type = "static"

            [[user_service.users]]
            username = "alice"
            password = "wonderland"

            [[user_service.roles]]
            name = "acme-admins"
            users = ["alice"]
            permissions = [{ owner_key = "acme", access = "all" }]

            [[store.owners]]
            key = "acme"

            [[store.consumers]]
            uuid = "6d1f6c4e-5f3b-4c38-9a39-0f3c2b1d7e11"
            name = "web-01"
            owner = "acme"

            [observability.logging]
            level = "debug"
            format = "json"
        "#,
        )
        .unwrap();

        assert_eq!(
            config.auth.enabled_strategies(),
            vec!["oauth", "basic", "certificate", "trusted_consumer", "trusted_user"]
        );
        assert_eq!(config.server.port, 9000);
        let UserServiceConfig::Static(users) = &config.user_service else {
            panic!("expected static user service");
        };
        assert_eq!(users.users[0].username, "alice");
        assert!(users.roles[0].grants("acme", Access::All));
        assert_eq!(config.store.consumers.len(), 1);
        assert_eq!(config.observability.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_ldap_defaults() {
        let config = AppConfig::from_str(
            r#"
            [user_service]
            type = "ldap"
        "#,
        );

        #[cfg(feature = "ldap")]
        {
            let config = config.unwrap();
            let UserServiceConfig::Ldap(ldap) = &config.user_service else {
                panic!("expected ldap user service");
            };
            assert_eq!(ldap.base, "dc=example,dc=com");
            assert_eq!(ldap.url(), "ldap://example.com:389");
            assert_eq!(ldap.connect_timeout_secs, 5);
        }
        #[cfg(not(feature = "ldap"))]
        assert!(config.unwrap_err().to_string().contains("ldap"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = AppConfig::from_str(
            r#"
            [auth.basic]
            enabled = true
            realm = "x"
        "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_oauth_without_consumers_rejected() {
        let err = AppConfig::from_str(
            r#"
            [auth.oauth]
            enabled = true
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("auth.oauth.consumers"));
    }

    #[test]
    fn test_oauth_empty_secret_rejected() {
        let err = AppConfig::from_str(
            r#"
            [auth.oauth]
            enabled = true
            consumers = { billing = "" }
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("billing"));
    }

    #[test]
    fn test_oauth_base_url_must_have_host() {
        for base_url in [
            "https://",
            "ftp://example.com",
            "example.com",
            "https://example.com/?a=1",
        ] {
            let err = AppConfig::from_str(&format!(
                r#"
                [auth.oauth]
                enabled = true
                consumers = {{ billing = "s3cret" }}
                base_url = "{}"
            "#,
                base_url
            ))
            .unwrap_err();
            assert!(
                err.to_string().contains("auth.oauth.base_url"),
                "{base_url}: {err}"
            );
        }
    }

    #[test]
    fn test_oauth_base_url_with_path_accepted() {
        let config = AppConfig::from_str(
            r#"
            [auth.oauth]
            enabled = true
            consumers = { billing = "s3cret" }
            base_url = "https://Entitlements.Example.com:8443/api/"
        "#,
        )
        .unwrap();
        let url = config.auth.oauth.parsed_base_url().unwrap().unwrap();
        assert_eq!(url.host_str(), Some("entitlements.example.com"));
        assert_eq!(url.port(), Some(8443));
        assert_eq!(url.path(), "/api/");
    }

    #[test]
    fn test_disabled_oauth_needs_nothing() {
        let config = AppConfig::from_str(
            r#"
            [auth.oauth]
            enabled = false
        "#,
        )
        .unwrap();
        assert!(config.auth.enabled_strategies().is_empty());
    }

    #[test]
    fn test_basic_without_user_service_rejected() {
        let err = AppConfig::from_str(
            r#"
            [auth.basic]
            enabled = true
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("user_service"));
    }

    #[test]
    fn test_trusted_with_invalid_header_rejected() {
        let err = AppConfig::from_str(
            r#"
            [auth.trusted]
            enabled = true
            consumer_header = ""

            [user_service]
            type = "static"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("consumer_header"));
    }

    #[test]
    fn test_trusted_headers_must_differ() {
        let err = AppConfig::from_str(
            r#"
            [auth.trusted]
            enabled = true
            consumer_header = "X-Identity"
            user_header = "x-identity"

            [user_service]
            type = "static"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_certificate_without_header_is_allowed() {
        let config = AppConfig::from_str(
            r#"
            [auth.certificate]
            enabled = true
        "#,
        )
        .unwrap();
        assert!(config.auth.certificate.subject_header.is_none());
    }

    #[test]
    fn test_invalid_trusted_proxy_cidr_rejected() {
        let err = AppConfig::from_str(
            r#"
            [server.trusted_proxies]
            cidrs = ["10.0.0.0/33"]
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("10.0.0.0/33"));
    }

    #[test]
    fn test_consumer_with_unknown_owner_rejected() {
        let err = AppConfig::from_str(
            r#"
            [[store.consumers]]
            uuid = "6d1f6c4e-5f3b-4c38-9a39-0f3c2b1d7e11"
            name = "web-01"
            owner = "nobody"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("nobody"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 7070").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 7070);

        let err = AppConfig::from_file("/nonexistent/gate.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }

    #[test]
    fn test_secret_from_env() {
        temp_env::with_var("TEST_GATE_OAUTH_SECRET", Some("from-env"), || {
            let config = AppConfig::from_str(
                r#"
                [auth.oauth]
                enabled = true
                consumers = { billing = "${TEST_GATE_OAUTH_SECRET}" }
            "#,
            )
            .unwrap();
            assert_eq!(config.auth.oauth.consumers["billing"], "from-env");
        });
    }

    #[test]
    fn test_missing_env_var() {
        let err = AppConfig::from_str("port = \"${TEST_GATE_DEFINITELY_UNSET}\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvVarNotFound(ref v) if v == "TEST_GATE_DEFINITELY_UNSET"
        ));
    }

    #[test]
    fn test_env_var_in_comment_ignored() {
        let result = expand_env_vars("# secret = \"${NONEXISTENT_VAR}\"").unwrap();
        assert_eq!(result, "# secret = \"${NONEXISTENT_VAR}\"");
    }

    #[test]
    fn test_env_var_before_comment_expanded() {
        temp_env::with_var("TEST_BEFORE_COMMENT", Some("expanded"), || {
            let result =
                expand_env_vars("key = \"${TEST_BEFORE_COMMENT}\" # ${NONEXISTENT}").unwrap();
            assert_eq!(result, "key = \"expanded\" # ${NONEXISTENT}");
        });
    }
}
