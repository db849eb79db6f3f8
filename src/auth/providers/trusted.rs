//! Identity asserted by request headers.
//!
//! These strategies carry no credential of their own. On their own they are
//! only as trustworthy as the network path to the server, so they honour
//! `server.trusted_proxies` when it is configured. Inside OAuth they run
//! after the signature has been verified and are not gated.

use std::sync::Arc;

use async_trait::async_trait;
use http::request::Parts;
use uuid::Uuid;

use super::{AuthProvider, ProxyGate, header_str};
use crate::{
    auth::{AuthError, Principal},
    config::TrustedProxiesConfig,
    directory::UserServiceAdapter,
    store::ConsumerStore,
};

/// Consumer named by UUID in a header (`cp-consumer` by default).
pub struct TrustedConsumerAuth {
    header: String,
    consumers: Arc<dyn ConsumerStore>,
    gate: ProxyGate,
}

impl TrustedConsumerAuth {
    pub fn new(
        header: impl Into<String>,
        consumers: Arc<dyn ConsumerStore>,
        trusted_proxies: &TrustedProxiesConfig,
    ) -> Self {
        Self {
            header: header.into(),
            consumers,
            gate: ProxyGate::new(trusted_proxies),
        }
    }

    pub(crate) fn ungated(header: impl Into<String>, consumers: Arc<dyn ConsumerStore>) -> Self {
        Self::new(header, consumers, &TrustedProxiesConfig::default())
    }
}

#[async_trait]
impl AuthProvider for TrustedConsumerAuth {
    fn name(&self) -> &'static str {
        "trusted_consumer"
    }

    async fn authenticate(&self, parts: &Parts) -> Result<Option<Principal>, AuthError> {
        let Some(value) = header_str(parts, &self.header)? else {
            return Ok(None);
        };
        self.gate.check(parts, &self.header)?;

        let uuid = Uuid::parse_str(value)
            .map_err(|_| AuthError::Malformed(format!("{} is not a UUID", self.header)))?;

        match self.consumers.find_by_uuid(uuid).await? {
            Some(consumer) => Ok(Some(Principal::consumer(consumer))),
            None => {
                tracing::debug!(
                    consumer_uuid = %uuid,
                    "Trusted consumer header names unknown consumer"
                );
                Ok(None)
            }
        }
    }
}

/// User named by login in a header (`cp-user` by default).
pub struct TrustedUserAuth {
    header: String,
    users: Arc<dyn UserServiceAdapter>,
    gate: ProxyGate,
}

impl TrustedUserAuth {
    pub fn new(
        header: impl Into<String>,
        users: Arc<dyn UserServiceAdapter>,
        trusted_proxies: &TrustedProxiesConfig,
    ) -> Self {
        Self {
            header: header.into(),
            users,
            gate: ProxyGate::new(trusted_proxies),
        }
    }

    pub(crate) fn ungated(header: impl Into<String>, users: Arc<dyn UserServiceAdapter>) -> Self {
        Self::new(header, users, &TrustedProxiesConfig::default())
    }
}

#[async_trait]
impl AuthProvider for TrustedUserAuth {
    fn name(&self) -> &'static str {
        "trusted_user"
    }

    async fn authenticate(&self, parts: &Parts) -> Result<Option<Principal>, AuthError> {
        let Some(username) = header_str(parts, &self.header)? else {
            return Ok(None);
        };
        self.gate.check(parts, &self.header)?;

        match self.users.find_by_login(username).await? {
            Some(found) => Ok(Some(Principal::User {
                username: found.user.username,
                roles: found.roles,
                super_admin: found.user.super_admin,
            })),
            None => {
                tracing::debug!(username, "Trusted user header names unknown user");
                Ok(None)
            }
        }
    }
}
