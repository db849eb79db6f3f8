//! Authentication middleware.
//!
//! Runs the [`AuthInterceptor`](crate::auth::AuthInterceptor) for every
//! request. It never short-circuits: an unauthenticated request reaches the
//! handler with a `NoAuth` principal and the handler decides.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;

pub async fn auth_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();

    let ctx = state.interceptor.pre_process(&mut parts).await;
    tracing::Span::current().record(
        "principal",
        tracing::field::display(format!(
            "{}:{}",
            ctx.principal().principal_type(),
            ctx.principal().name()
        )),
    );

    next.run(Request::from_parts(parts, body)).await
}
