use serde::{Deserialize, Serialize};

use super::Role;

/// A human account known to a user directory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    /// Credential, only populated for directories that store one.
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    #[serde(default)]
    pub super_admin: bool,
}

impl User {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
            super_admin: false,
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("super_admin", &self.super_admin)
            .finish()
    }
}

/// A user together with the roles a directory lookup resolved for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserWithRoles {
    pub user: User,
    pub roles: Vec<Role>,
}
