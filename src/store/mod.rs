//! Persistence seams for the records the auth pipeline reads and writes.
//!
//! The real entity store lives outside this crate; these traits are the
//! point lookups and the checkin write the pipeline depends on.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
pub use memory::MemoryStore;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::RequestContext,
    models::{Consumer, Owner},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// The acting principal may not perform this write.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ConsumerStore: Send + Sync {
    async fn find_by_uuid(&self, uuid: Uuid) -> StoreResult<Option<Consumer>>;

    /// Record that a consumer has just authenticated.
    ///
    /// `ctx` is the published context of the request doing the checkin; the
    /// write is attributed to (and authorized against) its principal.
    async fn update_last_checkin(
        &self,
        ctx: &RequestContext,
        uuid: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Consumer>;
}

#[async_trait]
pub trait OwnerStore: Send + Sync {
    async fn find_by_key(&self, key: &str) -> StoreResult<Option<Owner>>;
}
