//! Request authentication pipeline and REST front door for an entitlement
//! server.
//!
//! Every inbound request is run through a configurable chain of
//! authentication strategies (OAuth request signing, HTTP Basic against a
//! user directory, client certificates, trusted headers). The winning
//! principal, or the anonymous one, is published as a
//! [`RequestContext`](auth::RequestContext) for handlers to authorize
//! against.

pub mod auth;
pub mod config;
pub mod directory;
pub mod middleware;
pub mod models;
#[cfg(feature = "server")]
pub mod observability;
pub mod routes;
pub mod store;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    auth::{AuthCollaborators, AuthInterceptor},
    config::{AppConfig, ConfigError, UserServiceConfig},
    directory::{StaticUserService, UserServiceAdapter},
    store::{ConsumerStore, MemoryStore, OwnerStore},
};

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub interceptor: Arc<AuthInterceptor>,
    pub consumers: Arc<dyn ConsumerStore>,
    pub owners: Arc<dyn OwnerStore>,
}

impl AppState {
    /// Wire the in-memory store, the configured user directory and the
    /// provider chain.
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        let store = Arc::new(MemoryStore::from_config(&config.store));
        let user_service = build_user_service(&config.user_service)?;

        let interceptor = AuthInterceptor::from_config(
            &config,
            AuthCollaborators {
                consumers: store.clone(),
                user_service,
            },
        )?;

        Ok(Self {
            config: Arc::new(config),
            interceptor: Arc::new(interceptor),
            consumers: store.clone(),
            owners: store,
        })
    }
}

/// Instantiate the user directory named by `[user_service]`.
pub fn build_user_service(
    config: &UserServiceConfig,
) -> Result<Option<Arc<dyn UserServiceAdapter>>, ConfigError> {
    let service: Arc<dyn UserServiceAdapter> = match config {
        UserServiceConfig::None => return Ok(None),
        UserServiceConfig::Static(users) => Arc::new(StaticUserService::from_config(users)),
        #[cfg(feature = "ldap")]
        UserServiceConfig::Ldap(ldap) => {
            tracing::info!(url = %ldap.url(), base = %ldap.base, "Using LDAP user service");
            Arc::new(directory::LdapUserServiceAdapter::from_config(ldap))
        }
        #[cfg(not(feature = "ldap"))]
        UserServiceConfig::Ldap(_) => {
            return Err(ConfigError::Validation(
                "user_service type 'ldap' requires the 'ldap' feature".into(),
            ));
        }
    };
    Ok(Some(service))
}

/// Build the router with the tracing, request-id and auth layers.
///
/// The auth layer sits inside the request-id span so it can record the
/// resolved principal on it.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/status", get(routes::status))
        .route("/users/me", get(routes::whoami))
        .route("/owners/{key}", get(routes::get_owner))
        .route("/consumers/{uuid}", get(routes::get_consumer))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
