use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{ConsumerStore, OwnerStore, StoreError, StoreResult};
use crate::{
    auth::RequestContext,
    config::StoreConfig,
    models::{Access, Consumer, Owner},
};

/// Process-local store backing both [`ConsumerStore`] and [`OwnerStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    owners: DashMap<String, Owner>,
    consumers: DashMap<Uuid, Consumer>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from the `[store]` config section.
    pub fn from_config(config: &StoreConfig) -> Self {
        let store = Self::new();
        for owner in &config.owners {
            store.insert_owner(Owner {
                key: owner.key.clone(),
                display_name: owner
                    .display_name
                    .clone()
                    .unwrap_or_else(|| owner.key.clone()),
            });
        }
        for consumer in &config.consumers {
            store.insert_consumer(Consumer::new(
                consumer.uuid,
                consumer.name.clone(),
                consumer.owner.clone(),
            ));
        }
        tracing::debug!(
            owners = store.owners.len(),
            consumers = store.consumers.len(),
            "Seeded in-memory store"
        );
        store
    }

    pub fn insert_owner(&self, owner: Owner) {
        self.owners.insert(owner.key.clone(), owner);
    }

    pub fn insert_consumer(&self, consumer: Consumer) {
        self.consumers.insert(consumer.uuid, consumer);
    }
}

#[async_trait]
impl ConsumerStore for MemoryStore {
    async fn find_by_uuid(&self, uuid: Uuid) -> StoreResult<Option<Consumer>> {
        Ok(self.consumers.get(&uuid).map(|c| c.clone()))
    }

    async fn update_last_checkin(
        &self,
        ctx: &RequestContext,
        uuid: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Consumer> {
        let mut consumer = self
            .consumers
            .get_mut(&uuid)
            .ok_or_else(|| StoreError::NotFound(format!("consumer {}", uuid)))?;

        if !ctx.principal().can_access_consumer(&consumer, Access::All) {
            return Err(StoreError::Forbidden(format!(
                "{} '{}' may not check in consumer {}",
                ctx.principal().principal_type(),
                ctx.principal().name(),
                uuid
            )));
        }

        consumer.last_checkin = Some(at);
        Ok(consumer.clone())
    }
}

#[async_trait]
impl OwnerStore for MemoryStore {
    async fn find_by_key(&self, key: &str) -> StoreResult<Option<Owner>> {
        Ok(self.owners.get(key).map(|o| o.clone()))
    }
}
