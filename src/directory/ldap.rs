//! LDAP-backed user directory.
//!
//! Authentication is a simple bind as `uid=<username>,<base>`; lookup is an
//! anonymous base-scope read of the same DN. The `ou` attribute of the entry
//! names the organization the user administers, which is turned into a
//! synthetic `ldap` role on every lookup. Nothing is cached.
//!
//! The directory is read-only from this side: user writes are pass-through
//! no-ops and role management is unsupported.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use super::{DirectoryError, DirectoryResult, UserServiceAdapter};
use crate::models::{Access, OwnerPermission, Role, User, UserWithRoles};

/// Name of the role synthesized from the directory entry.
pub const LDAP_ROLE_NAME: &str = "ldap";

const OU_ATTRIBUTE: &str = "ou";

/// A directory entry as returned by a base-scope read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdapEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl LdapEntry {
    /// First value of an attribute, if present.
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attrs
            .get(attribute)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Protocol operations the adapter needs from an LDAP client.
///
/// Every call opens its own connection and releases it before returning,
/// whatever the outcome.
#[async_trait]
pub trait LdapConnector: Send + Sync {
    /// Simple-bind as `dn`. `Ok` means the server accepted the credentials.
    async fn bind(&self, dn: &str, password: &str) -> DirectoryResult<()>;

    /// Anonymously read the entry at `dn`. `Ok(None)` when it does not exist.
    async fn read_entry(&self, dn: &str, attributes: &[&str])
    -> DirectoryResult<Option<LdapEntry>>;
}

pub struct LdapUserServiceAdapter {
    base: String,
    connector: Arc<dyn LdapConnector>,
}

impl LdapUserServiceAdapter {
    pub fn new(base: impl Into<String>, connector: Arc<dyn LdapConnector>) -> Self {
        Self {
            base: base.into(),
            connector,
        }
    }

    /// Build an adapter talking to a real server through `ldap3`.
    #[cfg(feature = "ldap")]
    pub fn from_config(config: &crate::config::LdapConfig) -> Self {
        Self::new(
            config.base.clone(),
            Arc::new(super::Ldap3Connector::new(config)),
        )
    }

    /// Distinguished name for a login. The username is inserted verbatim.
    pub fn user_dn(&self, username: &str) -> String {
        format!("uid={},{}", username, self.base)
    }

    fn ldap_role(username: &str, owner_key: &str) -> Role {
        Role::new(LDAP_ROLE_NAME)
            .with_user(username)
            .with_permission(OwnerPermission::new(owner_key, Access::All))
    }
}

#[async_trait]
impl UserServiceAdapter for LdapUserServiceAdapter {
    fn name(&self) -> &'static str {
        "ldap"
    }

    /// Simple-bind as `uid=<username>,<base>`; a successful bind is the only
    /// way to get `true`.
    ///
    /// An empty password is rejected without contacting the server, since a
    /// simple bind with no password is an unauthenticated bind that most
    /// servers accept.
    async fn validate_user(&self, username: &str, password: &str) -> DirectoryResult<bool> {
        if password.is_empty() {
            tracing::debug!(username, "Rejecting LDAP bind with empty password");
            return Ok(false);
        }

        let dn = self.user_dn(username);
        match self.connector.bind(&dn, password).await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::debug!(dn = %dn, error = %e, "LDAP bind failed");
                Ok(false)
            }
        }
    }

    async fn find_by_login(&self, username: &str) -> DirectoryResult<Option<UserWithRoles>> {
        let dn = self.user_dn(username);
        let entry = match self.connector.read_entry(&dn, &[OU_ATTRIBUTE]).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::debug!(dn = %dn, error = %e, "LDAP lookup failed");
                return Ok(None);
            }
        };

        let roles = match entry.first(OU_ATTRIBUTE) {
            Some(ou) => vec![Self::ldap_role(username, ou)],
            None => {
                tracing::debug!(dn = %dn, "LDAP entry has no ou attribute");
                Vec::new()
            }
        };

        Ok(Some(UserWithRoles {
            user: User::new(username, None),
            roles,
        }))
    }

    async fn create_user(&self, user: User) -> DirectoryResult<User> {
        Ok(user)
    }

    async fn update_user(&self, user: User) -> DirectoryResult<User> {
        Ok(user)
    }

    async fn delete_user(&self, _user: &User) -> DirectoryResult<()> {
        Ok(())
    }

    async fn list_users(&self) -> DirectoryResult<Vec<User>> {
        Ok(Vec::new())
    }

    async fn create_role(&self, _role: Role) -> DirectoryResult<Role> {
        Err(DirectoryError::Unsupported("create_role"))
    }

    async fn get_role(&self, _name: &str) -> DirectoryResult<Option<Role>> {
        Err(DirectoryError::Unsupported("get_role"))
    }

    async fn list_roles(&self) -> DirectoryResult<Vec<Role>> {
        Err(DirectoryError::Unsupported("list_roles"))
    }

    async fn update_role(&self, _role: Role) -> DirectoryResult<Role> {
        Err(DirectoryError::Unsupported("update_role"))
    }

    async fn delete_role(&self, _name: &str) -> DirectoryResult<()> {
        Err(DirectoryError::Unsupported("delete_role"))
    }

    async fn add_user_to_role(&self, _role: &str, _username: &str) -> DirectoryResult<Role> {
        Err(DirectoryError::Unsupported("add_user_to_role"))
    }

    async fn remove_user_from_role(&self, _role: &str, _username: &str) -> DirectoryResult<Role> {
        Err(DirectoryError::Unsupported("remove_user_from_role"))
    }
}
