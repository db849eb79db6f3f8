//! Configuration-backed user directory.
//!
//! Users and roles come from the `[user_service]` section of the config file
//! and live in memory for the lifetime of the process. Unlike LDAP, every
//! management operation is supported; changes are not written back.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use subtle::ConstantTimeEq;

use super::{DirectoryError, DirectoryResult, UserServiceAdapter};
use crate::{
    config::StaticUserServiceConfig,
    models::{Role, User, UserWithRoles},
};

#[derive(Debug, Default)]
pub struct StaticUserService {
    users: RwLock<BTreeMap<String, User>>,
    roles: RwLock<BTreeMap<String, Role>>,
}

impl StaticUserService {
    pub fn new(
        users: impl IntoIterator<Item = User>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            users: RwLock::new(
                users
                    .into_iter()
                    .map(|u| (u.username.clone(), u))
                    .collect(),
            ),
            roles: RwLock::new(roles.into_iter().map(|r| (r.name.clone(), r)).collect()),
        }
    }

    pub fn from_config(config: &StaticUserServiceConfig) -> Self {
        let users = config.users.iter().map(|u| User {
            username: u.username.clone(),
            password: Some(u.password.clone()),
            super_admin: u.super_admin,
        });
        Self::new(users, config.roles.iter().cloned())
    }

    fn roles_for(&self, username: &str) -> Vec<Role> {
        self.roles
            .read()
            .values()
            .filter(|r| r.users.contains(username))
            .cloned()
            .collect()
    }

    fn modify_role(
        &self,
        name: &str,
        f: impl FnOnce(&mut Role),
    ) -> DirectoryResult<Role> {
        let mut roles = self.roles.write();
        let role = roles
            .get_mut(name)
            .ok_or_else(|| DirectoryError::NotFound(format!("role '{}'", name)))?;
        f(role);
        Ok(role.clone())
    }
}

#[async_trait]
impl UserServiceAdapter for StaticUserService {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn validate_user(&self, username: &str, password: &str) -> DirectoryResult<bool> {
        let users = self.users.read();
        let Some(stored) = users.get(username).and_then(|u| u.password.as_deref()) else {
            return Ok(false);
        };
        Ok(stored.as_bytes().ct_eq(password.as_bytes()).into())
    }

    async fn find_by_login(&self, username: &str) -> DirectoryResult<Option<UserWithRoles>> {
        let Some(user) = self.users.read().get(username).cloned() else {
            return Ok(None);
        };
        let roles = self.roles_for(username);
        Ok(Some(UserWithRoles { user, roles }))
    }

    async fn create_user(&self, user: User) -> DirectoryResult<User> {
        let mut users = self.users.write();
        if users.contains_key(&user.username) {
            return Err(DirectoryError::Conflict(format!(
                "user '{}' already exists",
                user.username
            )));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> DirectoryResult<User> {
        let mut users = self.users.write();
        let existing = users
            .get_mut(&user.username)
            .ok_or_else(|| DirectoryError::NotFound(format!("user '{}'", user.username)))?;
        *existing = user.clone();
        Ok(user)
    }

    async fn delete_user(&self, user: &User) -> DirectoryResult<()> {
        self.users.write().remove(&user.username);
        for role in self.roles.write().values_mut() {
            role.users.remove(&user.username);
        }
        Ok(())
    }

    async fn list_users(&self) -> DirectoryResult<Vec<User>> {
        Ok(self.users.read().values().cloned().collect())
    }

    async fn create_role(&self, role: Role) -> DirectoryResult<Role> {
        let mut roles = self.roles.write();
        if roles.contains_key(&role.name) {
            return Err(DirectoryError::Conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }
        roles.insert(role.name.clone(), role.clone());
        Ok(role)
    }

    async fn get_role(&self, name: &str) -> DirectoryResult<Option<Role>> {
        Ok(self.roles.read().get(name).cloned())
    }

    async fn list_roles(&self) -> DirectoryResult<Vec<Role>> {
        Ok(self.roles.read().values().cloned().collect())
    }

    async fn update_role(&self, role: Role) -> DirectoryResult<Role> {
        let updated = role.clone();
        self.modify_role(&updated.name, move |existing| *existing = role)?;
        Ok(updated)
    }

    async fn delete_role(&self, name: &str) -> DirectoryResult<()> {
        self.roles
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DirectoryError::NotFound(format!("role '{}'", name)))
    }

    async fn add_user_to_role(&self, role: &str, username: &str) -> DirectoryResult<Role> {
        if !self.users.read().contains_key(username) {
            return Err(DirectoryError::NotFound(format!("user '{}'", username)));
        }
        self.modify_role(role, |r| r.add_user(username))
    }

    async fn remove_user_from_role(&self, role: &str, username: &str) -> DirectoryResult<Role> {
        self.modify_role(role, |r| {
            r.users.remove(username);
        })
    }
}
