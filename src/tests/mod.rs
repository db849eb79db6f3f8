//! Router-level tests that exercise the full middleware stack.

mod auth_e2e;
