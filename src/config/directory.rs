use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;

/// Which user directory backs Basic and trusted-user authentication.
///
/// ```toml
/// [user_service]
/// type = "ldap"
/// host = "ldap.example.com"
/// base = "dc=example,dc=com"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserServiceConfig {
    /// No directory. Strategies that need one cannot be enabled.
    #[default]
    None,
    Ldap(LdapConfig),
    Static(StaticUserServiceConfig),
}

impl UserServiceConfig {
    pub fn is_configured(&self) -> bool {
        !matches!(self, UserServiceConfig::None)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            UserServiceConfig::None => "none",
            UserServiceConfig::Ldap(_) => "ldap",
            UserServiceConfig::Static(_) => "static",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LdapConfig {
    #[serde(default = "default_ldap_host")]
    pub host: String,
    #[serde(default = "default_ldap_port")]
    pub port: u16,
    /// Base DN user entries live under (`uid=<login>,<base>`).
    #[serde(default = "default_ldap_base")]
    pub base: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            host: default_ldap_host(),
            port: default_ldap_port(),
            base: default_ldap_base(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl LdapConfig {
    pub fn url(&self) -> String {
        format!("ldap://{}:{}", self.host, self.port)
    }
}

fn default_ldap_host() -> String {
    "example.com".to_string()
}

fn default_ldap_port() -> u16 {
    389
}

fn default_ldap_base() -> String {
    "dc=example,dc=com".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticUserServiceConfig {
    #[serde(default)]
    pub users: Vec<StaticUserConfig>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticUserConfig {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub super_admin: bool,
}

impl std::fmt::Debug for StaticUserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticUserConfig")
            .field("username", &self.username)
            .field("password", &"****")
            .field("super_admin", &self.super_admin)
            .finish()
    }
}

/// Records loaded into the in-memory store at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub owners: Vec<OwnerSeed>,
    pub consumers: Vec<ConsumerSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OwnerSeed {
    pub key: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsumerSeed {
    pub uuid: Uuid,
    pub name: String,
    /// Key of the owning organization.
    pub owner: String,
}
