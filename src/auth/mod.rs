//! Request authentication.
//!
//! [`AuthInterceptor`] runs the configured [`providers`] in precedence order
//! and publishes the resulting [`Principal`] as a [`RequestContext`].

mod context;
mod error;
mod interceptor;
mod principal;
pub mod providers;

pub use context::RequestContext;
pub use error::AuthError;
pub use interceptor::{AuthCollaborators, AuthInterceptor};
pub use principal::Principal;
pub use providers::{AuthProvider, ClientCertificate};
