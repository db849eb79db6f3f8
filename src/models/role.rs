use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Access level granted on an organization.
///
/// Levels are ordered: `All` implies `ReadOnly`, which implies `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    None,
    ReadOnly,
    All,
}

impl Access {
    /// Whether holding `self` satisfies a check for `required`.
    pub fn provides(self, required: Access) -> bool {
        self >= required
    }
}

/// Organization-scoped permission carried by a role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerPermission {
    pub owner_key: String,
    pub access: Access,
}

impl OwnerPermission {
    pub fn new(owner_key: impl Into<String>, access: Access) -> Self {
        Self {
            owner_key: owner_key.into(),
            access,
        }
    }

    /// Whether this permission grants `required` on `owner_key`.
    pub fn grants(&self, owner_key: &str, required: Access) -> bool {
        self.owner_key == owner_key && self.access.provides(required)
    }
}

/// A named grouping of users with organization-scoped permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    /// Usernames of the members.
    #[serde(default)]
    pub users: BTreeSet<String>,
    #[serde(default)]
    pub permissions: BTreeSet<OwnerPermission>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users: BTreeSet::new(),
            permissions: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_user(mut self, username: impl Into<String>) -> Self {
        self.users.insert(username.into());
        self
    }

    #[must_use]
    pub fn with_permission(mut self, permission: OwnerPermission) -> Self {
        self.permissions.insert(permission);
        self
    }

    pub fn add_user(&mut self, username: impl Into<String>) {
        self.users.insert(username.into());
    }

    pub fn grants(&self, owner_key: &str, required: Access) -> bool {
        self.permissions
            .iter()
            .any(|p| p.grants(owner_key, required))
    }
}
