use serde::{Deserialize, Serialize};

/// An organization that owns consumers, pools and subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    /// Unique, human-chosen key (e.g. "acme").
    pub key: String,
    pub display_name: String,
}

impl Owner {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            display_name: key.clone(),
            key,
        }
    }
}
