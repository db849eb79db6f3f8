//! Principal abstraction for the resolved identity of a request.
//!
//! A Principal represents "who is making the request" regardless of which
//! authentication strategy produced it (OAuth signature, Basic credentials,
//! client certificate, trusted header).
//!
//! # Principal Types
//!
//! - **NoAuth**: No strategy matched. Every request ends up with at least this.
//! - **Consumer**: A registered client/device, identified by its consumer record.
//! - **User**: A human user with directory-derived roles.
//! - **TrustedSystem**: An internal caller vouched for by a signed request.
//!
//! # Access Rules
//!
//! ```text
//! NoAuth         -> nothing
//! Consumer       -> ReadOnly/None on its own owner, never All
//! User           -> whatever its roles grant (super admins: everything)
//! TrustedSystem  -> everything
//! ```

use serde::Serialize;

use crate::models::{Access, Consumer, Role};

/// The authenticated actor making a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Principal {
    /// No authentication strategy produced an identity.
    NoAuth,

    /// A registered consumer (device/client identity).
    Consumer {
        /// The consumer record the credential resolved to.
        consumer: Consumer,
    },

    /// A human user.
    User {
        username: String,
        /// Roles resolved by the user directory for this request.
        roles: Vec<Role>,
        /// Super admins bypass owner-scoped permission checks.
        #[serde(default)]
        super_admin: bool,
    },

    /// An internally trusted system, e.g. an upstream service signing its
    /// requests with a shared OAuth secret.
    TrustedSystem {
        /// Identifier of the calling system (the OAuth consumer key).
        system_id: String,
    },
}

impl Principal {
    pub fn user(username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self::User {
            username: username.into(),
            roles,
            super_admin: false,
        }
    }

    pub fn consumer(consumer: Consumer) -> Self {
        Self::Consumer { consumer }
    }

    pub fn trusted_system(system_id: impl Into<String>) -> Self {
        Self::TrustedSystem {
            system_id: system_id.into(),
        }
    }

    /// Stable type tag, used in logs and serialized output.
    pub fn principal_type(&self) -> &'static str {
        match self {
            Self::NoAuth => "no_auth",
            Self::Consumer { .. } => "consumer",
            Self::User { .. } => "user",
            Self::TrustedSystem { .. } => "trusted_system",
        }
    }

    /// Display name for logging.
    pub fn name(&self) -> String {
        match self {
            Self::NoAuth => "anonymous".to_string(),
            Self::Consumer { consumer } => consumer.uuid.to_string(),
            Self::User { username, .. } => username.clone(),
            Self::TrustedSystem { system_id } => system_id.clone(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::NoAuth)
    }

    /// The consumer record, if this principal is a consumer.
    pub fn as_consumer(&self) -> Option<&Consumer> {
        match self {
            Self::Consumer { consumer } => Some(consumer),
            _ => None,
        }
    }

    /// Roles carried by this principal (only users have any).
    pub fn roles(&self) -> &[Role] {
        match self {
            Self::User { roles, .. } => roles,
            _ => &[],
        }
    }

    /// Trusted systems and super admins hold every access on every owner.
    pub fn is_unrestricted(&self) -> bool {
        matches!(
            self,
            Self::TrustedSystem { .. }
                | Self::User {
                    super_admin: true,
                    ..
                }
        )
    }

    /// Check whether this principal holds `required` access on an organization.
    pub fn can_access(&self, owner_key: &str, required: Access) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        match self {
            Self::Consumer { consumer } => {
                consumer.owner_key == owner_key && required < Access::All
            }
            Self::User { roles, .. } => roles.iter().any(|r| r.grants(owner_key, required)),
            Self::NoAuth | Self::TrustedSystem { .. } => false,
        }
    }

    /// Check whether this principal may act on a consumer record.
    ///
    /// A consumer always has full access to itself; everyone else needs the
    /// requested level on the consumer's owner.
    pub fn can_access_consumer(&self, target: &Consumer, required: Access) -> bool {
        if let Self::Consumer { consumer } = self
            && consumer.uuid == target.uuid
        {
            return true;
        }
        self.can_access(&target.owner_key, required)
    }
}
