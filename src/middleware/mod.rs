mod auth;
mod request_id;

pub use auth::auth_middleware;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
