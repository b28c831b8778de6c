//! REST API server module
//!
//! Read-only HTTP surface over the ingested trades:
//! - Health and readiness checks (`/healthz`, `/readyz`)
//! - Per-ticker aggregates (`/api/v1/aggregate`)
//!
//! Every request gets an `X-Request-ID`, a tracing span, a timeout and a
//! per-client rate limit.

pub mod handlers;
pub mod rate_limiter;
mod server;
pub mod types;

pub use handlers::ApiState;
pub use rate_limiter::RateLimiterState;
pub use server::{router, shutdown_signal, ApiServer, REQUEST_ID_HEADER, REQUEST_TIMEOUT};
