use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::Principal;

/// Request-scoped security context.
///
/// Published into the request extensions by the auth middleware before any
/// handler runs, and passed explicitly to side effects that need to know who
/// is acting (e.g. the consumer checkin write).
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id from the request-id middleware, if it ran first.
    pub request_id: Option<String>,
    pub principal: Arc<Principal>,
    pub authenticated_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(principal: Principal, request_id: Option<String>) -> Self {
        Self {
            request_id,
            principal: Arc::new(principal),
            authenticated_at: Utc::now(),
        }
    }

    /// Context for work not triggered by a client request.
    pub fn anonymous() -> Self {
        Self::new(Principal::NoAuth, None)
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
