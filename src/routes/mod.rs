//! HTTP surface.
//!
//! Every route runs behind the auth middleware and reads the published
//! [`RequestContext`]; none of them re-authenticate.

mod error;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
pub use error::{ApiError, ErrorInfo, ErrorResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{Principal, RequestContext},
    models::{Access, Consumer, Owner},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
}

pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// The caller as the server sees it.
#[derive(Debug, Serialize)]
pub struct WhoAmI {
    #[serde(flatten)]
    pub principal: Principal,
    pub authenticated_at: DateTime<Utc>,
}

pub async fn whoami(Extension(ctx): Extension<RequestContext>) -> Json<WhoAmI> {
    Json(WhoAmI {
        principal: ctx.principal().clone(),
        authenticated_at: ctx.authenticated_at,
    })
}

/// Anonymous callers get 401, authenticated callers failing `check` get 403.
fn authorize(ctx: &RequestContext, check: impl FnOnce(&Principal) -> bool) -> Result<(), ApiError> {
    let principal = ctx.principal();
    if principal.is_anonymous() {
        return Err(ApiError::Unauthorized);
    }
    if !check(principal) {
        return Err(ApiError::Forbidden(format!(
            "{} '{}' lacks access to this resource",
            principal.principal_type(),
            principal.name()
        )));
    }
    Ok(())
}

#[tracing::instrument(name = "owners.get", skip(state, ctx))]
pub async fn get_owner(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(key): Path<String>,
) -> Result<Json<Owner>, ApiError> {
    authorize(&ctx, |p| p.can_access(&key, Access::ReadOnly))?;

    state
        .owners
        .find_by_key(&key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("owner '{}' not found", key)))
}

#[tracing::instrument(name = "consumers.get", skip(state, ctx))]
pub async fn get_consumer(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<Consumer>, ApiError> {
    // An unknown consumer looks the same as a foreign one unless the caller
    // could read any consumer.
    let Some(consumer) = state.consumers.find_by_uuid(uuid).await? else {
        authorize(&ctx, Principal::is_unrestricted)?;
        return Err(ApiError::NotFound(format!("consumer {} not found", uuid)));
    };

    authorize(&ctx, |p| p.can_access_consumer(&consumer, Access::ReadOnly))?;
    Ok(Json(consumer))
}
