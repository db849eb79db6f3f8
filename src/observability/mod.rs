//! Observability: structured logging via `tracing`.

mod tracing_init;

pub use tracing_init::*;
