use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use http::{header::AUTHORIZATION, request::Parts};

use super::{AuthProvider, header_str};
use crate::{
    auth::{AuthError, Principal},
    directory::UserServiceAdapter,
};

/// HTTP Basic credentials checked against the user directory.
pub struct BasicAuth {
    users: Arc<dyn UserServiceAdapter>,
}

impl BasicAuth {
    pub fn new(users: Arc<dyn UserServiceAdapter>) -> Self {
        Self { users }
    }
}

/// Decode `Basic base64(user:pass)` into its two halves.
fn decode_credentials(encoded: &str) -> Result<(String, String), AuthError> {
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::Malformed("basic credentials are not base64".into()))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| AuthError::Malformed("basic credentials are not UTF-8".into()))?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| AuthError::Malformed("basic credentials missing ':'".into()))?;
    if username.is_empty() {
        return Err(AuthError::Malformed("empty username".into()));
    }
    Ok((username.to_string(), password.to_string()))
}

#[async_trait]
impl AuthProvider for BasicAuth {
    fn name(&self) -> &'static str {
        "basic"
    }

    async fn authenticate(&self, parts: &Parts) -> Result<Option<Principal>, AuthError> {
        let Some(header) = header_str(parts, AUTHORIZATION.as_str())? else {
            return Ok(None);
        };
        let Some(encoded) = header
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Basic"))
            .map(|(_, rest)| rest)
        else {
            return Ok(None);
        };

        let (username, password) = decode_credentials(encoded)?;

        if !self.users.validate_user(&username, &password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        match self.users.find_by_login(&username).await? {
            Some(found) => Ok(Some(Principal::User {
                username: found.user.username,
                roles: found.roles,
                super_admin: found.user.super_admin,
            })),
            None => {
                tracing::debug!(
                    username = %username,
                    directory = self.users.name(),
                    "Credentials valid but user lookup returned nothing"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{super::test_support::make_parts, *};
    use crate::{
        directory::{
            DirectoryResult, LdapConnector, LdapEntry, LdapUserServiceAdapter, StaticUserService,
        },
        models::{Access, OwnerPermission, Role, User},
    };

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass)))
    }

    fn provider() -> BasicAuth {
        BasicAuth::new(Arc::new(StaticUserService::new(
            [User::new("alice", Some("wonder:land".into()))],
            [Role::new("acme-admins")
                .with_user("alice")
                .with_permission(OwnerPermission::new("acme", Access::All))],
        )))
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let auth = provider();
        let header = basic("alice", "wonder:land");
        let parts = make_parts("GET", "/", &[("authorization", &header)]);

        let principal = auth.authenticate(&parts).await.unwrap().unwrap();
        assert_eq!(principal.name(), "alice");
        assert!(principal.can_access("acme", Access::All));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let auth = provider();
        let header = basic("alice", "nope");
        let parts = make_parts("GET", "/", &[("authorization", &header)]);

        assert!(matches!(
            auth.authenticate(&parts).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(auth.try_authenticate(&parts).await.is_none());
    }

    #[tokio::test]
    async fn test_other_schemes_abstain() {
        let auth = provider();
        for header in ["OAuth oauth_consumer_key=\"x\"", "Bearer abc"] {
            let parts = make_parts("GET", "/", &[("authorization", header)]);
            assert_eq!(auth.authenticate(&parts).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_malformed_credentials() {
        let auth = provider();
        let no_colon = format!("Basic {}", STANDARD.encode("alice"));
        for header in ["Basic !!!", no_colon.as_str()] {
            let parts = make_parts("GET", "/", &[("authorization", header)]);
            assert!(matches!(
                auth.authenticate(&parts).await,
                Err(AuthError::Malformed(_))
            ));
        }
    }

    /// Accepts every bind; has no entries.
    struct BindOnlyLdap;

    #[async_trait]
    impl LdapConnector for BindOnlyLdap {
        async fn bind(&self, _dn: &str, _password: &str) -> DirectoryResult<()> {
            Ok(())
        }

        async fn read_entry(
            &self,
            _dn: &str,
            _attributes: &[&str],
        ) -> DirectoryResult<Option<LdapEntry>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_validated_but_not_found_abstains() {
        let ldap = LdapUserServiceAdapter::new("dc=example,dc=com", Arc::new(BindOnlyLdap));
        assert!(ldap.validate_user("bob", "pw").await.unwrap());

        let auth = BasicAuth::new(Arc::new(ldap));
        let header = basic("bob", "pw");
        let parts = make_parts("GET", "/", &[("authorization", &header)]);
        assert_eq!(auth.authenticate(&parts).await.unwrap(), None);
    }
}
