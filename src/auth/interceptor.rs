//! The per-request authentication pipeline.
//!
//! ```text
//! OAuth ─▶ Basic ─▶ Certificate ─▶ Trusted consumer ─▶ Trusted user ─▶ NoAuth
//! ```
//!
//! Disabled strategies are simply not in the chain. The first strategy that
//! produces a principal wins; when none does the request continues as
//! anonymous. Nothing here rejects a request: deciding whether the resolved
//! principal may do what it asks is left to the handlers.

use std::sync::Arc;

use chrono::Utc;
use http::request::Parts;

use super::{
    Principal, RequestContext,
    providers::{
        AuthProvider, BasicAuth, CertificateAuth, OAuthAuth, TrustedConsumerAuth, TrustedUserAuth,
    },
};
use crate::{
    config::{AppConfig, ConfigError},
    directory::UserServiceAdapter,
    middleware::RequestId,
    store::ConsumerStore,
};

/// External services the strategies delegate to.
#[derive(Clone)]
pub struct AuthCollaborators {
    pub consumers: Arc<dyn ConsumerStore>,
    pub user_service: Option<Arc<dyn UserServiceAdapter>>,
}

pub struct AuthInterceptor {
    providers: Vec<Box<dyn AuthProvider>>,
    consumers: Arc<dyn ConsumerStore>,
}

impl AuthInterceptor {
    /// Build the provider chain from the `[auth]` flags.
    ///
    /// Fails if an enabled strategy lacks what it needs, so a misconfigured
    /// deployment refuses to start instead of silently treating every request
    /// as anonymous.
    pub fn from_config(
        config: &AppConfig,
        collaborators: AuthCollaborators,
    ) -> Result<Self, ConfigError> {
        let auth = &config.auth;
        let trusted_proxies = &config.server.trusted_proxies;
        let AuthCollaborators {
            consumers,
            user_service,
        } = collaborators;

        let require_users = |strategy: &str| {
            user_service.clone().ok_or_else(|| {
                ConfigError::Validation(format!(
                    "{} authentication requires a user_service",
                    strategy
                ))
            })
        };

        let mut providers: Vec<Box<dyn AuthProvider>> = Vec::new();

        if auth.oauth.enabled {
            if auth.oauth.consumers.is_empty() {
                return Err(ConfigError::Validation(
                    "oauth authentication requires at least one consumer secret".into(),
                ));
            }
            providers.push(Box::new(OAuthAuth::new(
                &auth.oauth,
                &auth.trusted,
                consumers.clone(),
                user_service.clone(),
            )?));
        }

        if auth.basic.enabled {
            providers.push(Box::new(BasicAuth::new(require_users("basic")?)));
        }

        if auth.certificate.enabled {
            providers.push(Box::new(CertificateAuth::new(
                &auth.certificate,
                consumers.clone(),
                trusted_proxies,
            )));
        }

        // Header-only strategies go last so any real credential takes precedence.
        if auth.trusted.enabled {
            let users = require_users("trusted")?;
            providers.push(Box::new(TrustedConsumerAuth::new(
                auth.trusted.consumer_header.clone(),
                consumers.clone(),
                trusted_proxies,
            )));
            providers.push(Box::new(TrustedUserAuth::new(
                auth.trusted.user_header.clone(),
                users,
                trusted_proxies,
            )));
        }

        let interceptor = Self::with_providers(providers, consumers);
        tracing::info!(
            providers = ?interceptor.provider_names(),
            "Authentication chain configured"
        );
        Ok(interceptor)
    }

    /// Build from an explicit, already ordered chain.
    pub fn with_providers(
        providers: Vec<Box<dyn AuthProvider>>,
        consumers: Arc<dyn ConsumerStore>,
    ) -> Self {
        Self {
            providers,
            consumers,
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Run the chain. Always yields a principal.
    pub async fn resolve(&self, parts: &Parts) -> Principal {
        for provider in &self.providers {
            if let Some(principal) = provider.try_authenticate(parts).await {
                tracing::debug!(
                    provider = provider.name(),
                    principal_type = principal.principal_type(),
                    principal = %principal.name(),
                    "Request authenticated"
                );
                return principal;
            }
            tracing::trace!(provider = provider.name(), "Provider abstained");
        }

        tracing::debug!("No provider matched, continuing as anonymous");
        Principal::NoAuth
    }

    /// Resolve, publish and check in.
    ///
    /// The context is inserted into the request extensions before the
    /// consumer checkin runs, and the checkin is performed under it.
    pub async fn pre_process(&self, parts: &mut Parts) -> RequestContext {
        let principal = self.resolve(parts).await;
        let request_id = parts.extensions.get::<RequestId>().map(|id| id.0.clone());

        parts
            .extensions
            .insert(RequestContext::new(principal, request_id));

        // Checkin runs under the context as the request now carries it.
        let ctx = parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(RequestContext::anonymous);

        if let Some(consumer) = ctx.principal().as_consumer()
            && let Err(e) = self
                .consumers
                .update_last_checkin(&ctx, consumer.uuid, Utc::now())
                .await
        {
            tracing::warn!(
                consumer_uuid = %consumer.uuid,
                error = %e,
                "Failed to record consumer checkin"
            );
        }

        ctx
    }
}
