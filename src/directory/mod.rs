//! Pluggable user directories.
//!
//! A [`UserServiceAdapter`] answers two questions for the auth pipeline
//! ("is this password right?" and "who is this user, with which roles?") and
//! exposes the user/role management surface that directory-backed
//! deployments may or may not support.

mod error;
#[cfg(feature = "ldap")]
mod ldap3_connector;
mod ldap;
mod static_users;

use async_trait::async_trait;
pub use error::{DirectoryError, DirectoryResult};
pub use ldap::{LdapConnector, LdapEntry, LdapUserServiceAdapter};
#[cfg(feature = "ldap")]
pub use ldap3_connector::Ldap3Connector;
pub use static_users::StaticUserService;

use crate::models::{Role, User, UserWithRoles};

#[async_trait]
pub trait UserServiceAdapter: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Check a username/password pair against the directory.
    async fn validate_user(&self, username: &str, password: &str) -> DirectoryResult<bool>;

    /// Look up a user by login name along with the roles it holds.
    async fn find_by_login(&self, username: &str) -> DirectoryResult<Option<UserWithRoles>>;

    async fn create_user(&self, user: User) -> DirectoryResult<User>;
    async fn update_user(&self, user: User) -> DirectoryResult<User>;
    async fn delete_user(&self, user: &User) -> DirectoryResult<()>;
    async fn list_users(&self) -> DirectoryResult<Vec<User>>;

    // Role management
    async fn create_role(&self, role: Role) -> DirectoryResult<Role>;
    async fn get_role(&self, name: &str) -> DirectoryResult<Option<Role>>;
    async fn list_roles(&self) -> DirectoryResult<Vec<Role>>;
    async fn update_role(&self, role: Role) -> DirectoryResult<Role>;
    async fn delete_role(&self, name: &str) -> DirectoryResult<()>;
    async fn add_user_to_role(&self, role: &str, username: &str) -> DirectoryResult<Role>;
    async fn remove_user_from_role(&self, role: &str, username: &str) -> DirectoryResult<Role>;
}
