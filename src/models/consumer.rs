use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered client or device identity, distinct from a human user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub uuid: Uuid,
    pub name: String,
    /// Key of the owning organization.
    pub owner_key: String,
    /// Last time this consumer authenticated against the server.
    pub last_checkin: Option<DateTime<Utc>>,
}

impl Consumer {
    pub fn new(uuid: Uuid, name: impl Into<String>, owner_key: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            owner_key: owner_key.into(),
            last_checkin: None,
        }
    }
}
